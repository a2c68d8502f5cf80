use clap::Parser;
use svc_bootstrap::config::{load_env_file_if_present, ProcessEnv};
use svc_bootstrap::utils::error::ErrorSeverity;
use svc_bootstrap::utils::validation::Validate;
use svc_bootstrap::{
    init_telemetry, AzureKeyVault, BootstrapError, EnvState, GcpSecretManager, SecretResolver,
    Settings,
};

#[derive(Debug, Parser)]
#[command(name = "svc-bootstrap")]
#[command(about = "Telemetry-ready service bootstrap")]
struct Cli {
    #[arg(long, default_value = ".env")]
    env_file: String,

    #[arg(long, help = "Overrides ENV_STATE (dev, test or prod)")]
    env_state: Option<String>,

    #[arg(long, help = "Enable verbose output")]
    verbose: bool,

    #[arg(long, help = "Validate configuration and exit")]
    check: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!(
            "❌ Startup failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }
}

async fn run(cli: Cli) -> Result<(), BootstrapError> {
    let applied = load_env_file_if_present(&cli.env_file)?;

    let state = match &cli.env_state {
        Some(value) => EnvState::parse(value)?,
        None => EnvState::from_env(&ProcessEnv)?,
    };

    let mut settings = Settings::load_for_state(state)?;
    if cli.verbose {
        settings.log_level = "DEBUG".to_string();
    }

    let _telemetry = init_telemetry(&settings)?;

    tracing::info!("Starting svc-bootstrap (state: {})", state.as_str());
    if applied > 0 {
        tracing::debug!("Applied {} variables from {}", applied, cli.env_file);
    }
    if cli.verbose {
        tracing::debug!("Settings: {:?}", settings);
    }

    let resolver = build_resolver(&settings).await;
    let mapping = Settings::secret_field_mapping();
    settings.resolve_secrets(&resolver, &mapping).await?;

    // Validation runs after secret resolution so resolved values are the
    // ones checked.
    settings.validate()?;

    if cli.check {
        tracing::info!("✅ Configuration is valid");
        println!("✅ Configuration is valid");
        return Ok(());
    }

    if settings.otel_enabled {
        tracing::info!(
            "📡 OpenTelemetry export enabled (endpoint: {})",
            settings.otel_trace_endpoint.as_deref().unwrap_or("-")
        );
    }
    tracing::info!("✅ Service ready, waiting for shutdown signal");

    wait_for_shutdown_signal().await;
    tracing::info!("Shutdown signal received, exiting");

    Ok(())
}

/// Configures one store per backend for which credentials are available.
/// Unconfigured backends fail lookups with a configuration error.
async fn build_resolver(settings: &Settings) -> SecretResolver {
    let mut resolver = SecretResolver::new();

    #[cfg(feature = "aws")]
    {
        resolver = resolver.with_aws(svc_bootstrap::AwsSecrets::from_default_chain().await);
    }

    match AzureKeyVault::from_settings(settings) {
        Ok(store) => resolver = resolver.with_azure(store),
        Err(_) => tracing::debug!("Azure Key Vault not configured, skipping"),
    }

    match GcpSecretManager::from_settings(settings) {
        Ok(store) => resolver = resolver.with_gcp(store),
        Err(_) => tracing::debug!("GCP Secret Manager not configured, skipping"),
    }

    resolver
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("register SIGTERM");
        let mut sigint = signal(SignalKind::interrupt()).expect("register SIGINT");
        tokio::select! {
            _ = sigterm.recv() => {}
            _ = sigint.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
