use crate::config::{EnvState, Settings};
use crate::utils::error::{BootstrapError, Result};
use opentelemetry::trace::TracerProvider as _;
use std::collections::HashMap;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Keeps the OTLP tracer provider alive for the process lifetime and
/// flushes batched spans on drop.
pub struct TelemetryGuard {
    tracer_provider: Option<opentelemetry_sdk::trace::TracerProvider>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.tracer_provider.take() {
            if let Err(e) = provider.shutdown() {
                eprintln!("Failed to shut down tracer provider: {:?}", e);
            }
        }
    }
}

/// Builds the subscriber filter. `RUST_LOG` wins when set; otherwise the
/// configured log level applies globally.
pub fn build_env_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(normalize_level(log_level)))
}

/// Maps configured level names onto tracing directives. `WARNING` is
/// accepted as an alias for `warn`.
fn normalize_level(level: &str) -> String {
    match level.to_ascii_uppercase().as_str() {
        "WARNING" => "warn".to_string(),
        _ => level.to_ascii_lowercase(),
    }
}

/// Headers attached to OTLP export requests.
pub fn otlp_headers(settings: &Settings) -> HashMap<String, String> {
    let mut headers = HashMap::new();
    if let Some(token) = &settings.otel_authorization_token {
        headers.insert("Authorization".to_string(), token.clone());
    }
    headers
}

/// Initializes the global tracing subscriber: compact console output for
/// Dev/Test, JSON for Prod, and an OTLP span exporter when OpenTelemetry
/// export is enabled. Must be called once, from the binary entry point.
pub fn init_telemetry(settings: &Settings) -> Result<TelemetryGuard> {
    let filter = build_env_filter(&settings.log_level);
    let json = settings.state == EnvState::Prod;
    let correlate = settings.otel_log_correlation;

    if settings.otel_enabled {
        // A missing endpoint is a configuration mistake, not an export
        // failure, and is reported with configuration severity.
        let endpoint = settings.otel_trace_endpoint.clone().ok_or_else(|| {
            BootstrapError::MissingConfigError {
                field: "OPEN_TELEMETRY_TRACE_ENDPOINT".to_string(),
            }
        })?;

        let provider = build_tracer_provider(&endpoint, otlp_headers(settings))?;
        let tracer = provider.tracer("svc-bootstrap");

        if json {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_current_span(correlate)
                        .with_span_list(correlate),
                )
                .with(tracing_opentelemetry::layer().with_tracer(tracer))
                .init();
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().compact())
                .with(tracing_opentelemetry::layer().with_tracer(tracer))
                .init();
        }

        Ok(TelemetryGuard {
            tracer_provider: Some(provider),
        })
    } else {
        if json {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_current_span(correlate)
                        .with_span_list(correlate),
                )
                .init();
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().compact())
                .init();
        }

        Ok(TelemetryGuard {
            tracer_provider: None,
        })
    }
}

fn build_tracer_provider(
    endpoint: &str,
    headers: HashMap<String, String>,
) -> Result<opentelemetry_sdk::trace::TracerProvider> {
    use opentelemetry_otlp::{WithExportConfig, WithHttpConfig};

    let mut builder = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint.to_string());
    if !headers.is_empty() {
        builder = builder.with_headers(headers);
    }

    let exporter = builder
        .build()
        .map_err(|e| BootstrapError::TelemetryError {
            message: format!("failed to build OTLP span exporter: {}", e),
        })?;

    Ok(opentelemetry_sdk::trace::TracerProvider::builder()
        .with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_level_accepts_warning_alias() {
        assert_eq!(normalize_level("WARNING"), "warn");
        assert_eq!(normalize_level("warning"), "warn");
        assert_eq!(normalize_level("DEBUG"), "debug");
        assert_eq!(normalize_level("info"), "info");
    }

    #[test]
    fn test_build_env_filter_accepts_configured_levels() {
        // EnvFilter::new falls back to the default directive on parse
        // failure, so this only has to not panic.
        let _ = build_env_filter("WARNING");
        let _ = build_env_filter("debug");
    }

    #[test]
    fn test_otlp_headers_carry_authorization_token() {
        let empty: HashMap<String, String> = HashMap::new();
        let mut settings = Settings::from_env(EnvState::Dev, &empty).unwrap();
        assert!(otlp_headers(&settings).is_empty());

        settings.otel_authorization_token = Some("Bearer abc".to_string());
        let headers = otlp_headers(&settings);
        assert_eq!(headers.get("Authorization").map(String::as_str), Some("Bearer abc"));
    }
}
