use crate::secrets::{SecretBackend, SecretResolver};
use crate::utils::error::{BootstrapError, Result};
use crate::utils::validation::{
    validate_log_level, validate_required_field, validate_url, Validate,
};
use std::collections::HashMap;

/// Deployment state selected by the `ENV_STATE` variable. Every settings
/// field is read under the matching prefix, so a single environment can
/// carry `DEV_`, `TEST_` and `PROD_` values side by side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvState {
    Dev,
    Test,
    Prod,
}

impl EnvState {
    pub fn parse(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "dev" => Ok(Self::Dev),
            "test" => Ok(Self::Test),
            "prod" => Ok(Self::Prod),
            _ => Err(BootstrapError::InvalidConfigValueError {
                field: "ENV_STATE".to_string(),
                value: value.to_string(),
                reason: "Possible values are: DEV, TEST, PROD".to_string(),
            }),
        }
    }

    pub fn from_env(env: &dyn EnvSource) -> Result<Self> {
        let value = env.get("ENV_STATE").ok_or_else(|| BootstrapError::ConfigError {
            message: "ENV_STATE is not set. Possible values are: DEV, TEST, PROD".to_string(),
        })?;
        Self::parse(&value)
    }

    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Dev => "DEV_",
            Self::Test => "TEST_",
            Self::Prod => "PROD_",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Test => "test",
            Self::Prod => "prod",
        }
    }
}

/// Source of environment variables. Settings are loaded through this seam
/// so tests can use plain maps instead of mutating process state.
pub trait EnvSource {
    fn get(&self, key: &str) -> Option<String>;
}

/// The real process environment. Empty values are treated as unset.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.is_empty())
    }
}

impl EnvSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).filter(|v| !v.is_empty()).cloned()
    }
}

/// Resolved service configuration for one [`EnvState`].
#[derive(Debug, Clone)]
pub struct Settings {
    pub state: EnvState,
    pub log_level: String,
    pub otel_log_correlation: bool,
    pub otel_enabled: bool,
    pub otel_trace_endpoint: Option<String>,
    pub otel_log_endpoint: Option<String>,
    pub otel_authorization_token: Option<String>,

    // AWS Secrets Manager access
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    pub aws_session_token: Option<String>,
    pub aws_region: Option<String>,

    // Azure Key Vault access
    pub azure_client_id: Option<String>,
    pub azure_client_secret: Option<String>,
    pub azure_tenant_id: Option<String>,
    pub azure_key_vault_url: Option<String>,

    // GCP Secret Manager access
    pub google_application_credentials: Option<String>,
    pub google_cloud_project: Option<String>,
}

/// Cloud credential variables promoted from `DEV_` prefixes to their bare
/// names in the Dev state, so SDK default credential chains pick them up.
const DEV_PROMOTED_VARS: &[&str] = &[
    "AWS_ACCESS_KEY_ID",
    "AWS_SECRET_ACCESS_KEY",
    "AWS_SESSION_TOKEN",
    "AWS_REGION",
    "GOOGLE_APPLICATION_CREDENTIALS",
    "AZURE_CLIENT_ID",
    "AZURE_CLIENT_SECRET",
    "AZURE_TENANT_ID",
    "AZURE_KEY_VAULT_URL",
];

impl Settings {
    /// Loads settings from the process environment, selecting the state
    /// from `ENV_STATE`. In the Dev state, `DEV_`-prefixed cloud credential
    /// variables are copied to their unprefixed names.
    pub fn load() -> Result<Self> {
        let state = EnvState::from_env(&ProcessEnv)?;
        Self::load_for_state(state)
    }

    /// Loads settings from the process environment for an already-known
    /// state, applying Dev credential promotion.
    pub fn load_for_state(state: EnvState) -> Result<Self> {
        if state == EnvState::Dev {
            promote_dev_credentials();
        }
        Self::from_env(state, &ProcessEnv)
    }

    pub fn from_env(state: EnvState, env: &dyn EnvSource) -> Result<Self> {
        let lookup = |key: &str| env.get(&format!("{}{}", state.prefix(), key));
        let lookup_bool = |key: &str, default: bool| -> Result<bool> {
            match lookup(key) {
                None => Ok(default),
                Some(value) => {
                    parse_bool(&value).ok_or_else(|| BootstrapError::InvalidConfigValueError {
                        field: format!("{}{}", state.prefix(), key),
                        value,
                        reason: "Expected a boolean (true/false, yes/no, 1/0)".to_string(),
                    })
                }
            }
        };

        let default_log_level = match state {
            EnvState::Dev | EnvState::Test => "DEBUG",
            EnvState::Prod => "WARNING",
        };

        Ok(Self {
            state,
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| default_log_level.to_string()),
            otel_log_correlation: lookup_bool("OTEL_LOG_CORRELATION", state == EnvState::Prod)?,
            otel_enabled: lookup_bool("OPEN_TELEMETRY_FLAG", state == EnvState::Prod)?,
            otel_trace_endpoint: lookup("OPEN_TELEMETRY_TRACE_ENDPOINT"),
            otel_log_endpoint: lookup("OPEN_TELEMETRY_LOG_ENDPOINT"),
            otel_authorization_token: lookup("OPEN_TELEMETRY_AUTHORIZATION_TOKEN"),
            aws_access_key_id: lookup("AWS_ACCESS_KEY_ID"),
            aws_secret_access_key: lookup("AWS_SECRET_ACCESS_KEY"),
            aws_session_token: lookup("AWS_SESSION_TOKEN"),
            aws_region: lookup("AWS_REGION"),
            azure_client_id: lookup("AZURE_CLIENT_ID"),
            azure_client_secret: lookup("AZURE_CLIENT_SECRET"),
            azure_tenant_id: lookup("AZURE_TENANT_ID"),
            azure_key_vault_url: lookup("AZURE_KEY_VAULT_URL"),
            google_application_credentials: lookup("GOOGLE_APPLICATION_CREDENTIALS"),
            google_cloud_project: lookup("GOOGLE_CLOUD_PROJECT"),
        })
    }

    /// Fields whose values are secret names to resolve through a cloud
    /// backend. The scaffold ships an empty mapping; services extend it
    /// with their own fields.
    pub fn secret_field_mapping() -> HashMap<&'static str, SecretBackend> {
        HashMap::new()
    }

    /// Replaces each mapped field's value (treated as a secret name) with
    /// the secret fetched from the mapped backend. Unset or empty fields
    /// are skipped; mapping a field name the settings type does not carry
    /// is a configuration error.
    pub async fn resolve_secrets(
        &mut self,
        resolver: &SecretResolver,
        mapping: &HashMap<&str, SecretBackend>,
    ) -> Result<()> {
        for (field, backend) in mapping {
            let Some(secret_name) = self.secret_field(field)?.clone() else {
                continue;
            };
            if secret_name.is_empty() {
                continue;
            }

            let resolved = resolver.fetch(*backend, &secret_name).await?;
            tracing::debug!("Resolved secret field {} via {:?}", field, backend);
            *self.secret_field(field)? = Some(resolved);
        }
        Ok(())
    }

    /// Mutable access to a secret-mappable field by name. Every optional
    /// string field is addressable so a mapping can never silently miss.
    fn secret_field(&mut self, name: &str) -> Result<&mut Option<String>> {
        match name {
            "otel_trace_endpoint" => Ok(&mut self.otel_trace_endpoint),
            "otel_log_endpoint" => Ok(&mut self.otel_log_endpoint),
            "otel_authorization_token" => Ok(&mut self.otel_authorization_token),
            "aws_access_key_id" => Ok(&mut self.aws_access_key_id),
            "aws_secret_access_key" => Ok(&mut self.aws_secret_access_key),
            "aws_session_token" => Ok(&mut self.aws_session_token),
            "aws_region" => Ok(&mut self.aws_region),
            "azure_client_id" => Ok(&mut self.azure_client_id),
            "azure_client_secret" => Ok(&mut self.azure_client_secret),
            "azure_tenant_id" => Ok(&mut self.azure_tenant_id),
            "azure_key_vault_url" => Ok(&mut self.azure_key_vault_url),
            "google_application_credentials" => Ok(&mut self.google_application_credentials),
            "google_cloud_project" => Ok(&mut self.google_cloud_project),
            _ => Err(BootstrapError::ConfigError {
                message: format!("Unknown secret-mapped field: {}", name),
            }),
        }
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        validate_log_level("LOG_LEVEL", &self.log_level)?;

        if let Some(endpoint) = &self.otel_trace_endpoint {
            validate_url("OPEN_TELEMETRY_TRACE_ENDPOINT", endpoint)?;
        }
        if let Some(endpoint) = &self.otel_log_endpoint {
            validate_url("OPEN_TELEMETRY_LOG_ENDPOINT", endpoint)?;
        }

        if self.otel_enabled {
            validate_required_field(
                "OPEN_TELEMETRY_TRACE_ENDPOINT",
                &self.otel_trace_endpoint,
            )?;
        }

        Ok(())
    }
}

fn promote_dev_credentials() {
    for var in DEV_PROMOTED_VARS {
        if let Ok(value) = std::env::var(format!("DEV_{}", var)) {
            if !value.is_empty() && std::env::var(var).is_err() {
                std::env::set_var(var, value);
            }
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "true" | "TRUE" | "True" | "yes" | "YES" => Some(true),
        "0" | "false" | "FALSE" | "False" | "no" | "NO" => Some(false),
        _ => None,
    }
}
