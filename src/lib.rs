pub mod config;
pub mod secrets;
pub mod telemetry;
pub mod utils;

#[cfg(feature = "aws")]
pub use secrets::aws::AwsSecrets;

pub use config::{EnvState, Settings};
pub use secrets::{azure::AzureKeyVault, gcp::GcpSecretManager, SecretBackend, SecretResolver};
pub use telemetry::{init_telemetry, TelemetryGuard};
pub use utils::error::{BootstrapError, Result};
pub use utils::retry::RetryPolicy;
