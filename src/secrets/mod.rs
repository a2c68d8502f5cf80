#[cfg(feature = "aws")]
pub mod aws;
pub mod azure;
pub mod gcp;

use crate::utils::error::{BootstrapError, Result};
use async_trait::async_trait;

/// Cloud secret manager selected for a given settings field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecretBackend {
    Aws,
    Azure,
    Gcp,
}

impl SecretBackend {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Aws => "AWS Secrets Manager",
            Self::Azure => "Azure Key Vault",
            Self::Gcp => "GCP Secret Manager",
        }
    }
}

#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetches the current value of the named secret.
    async fn fetch(&self, name: &str) -> Result<String>;
}

/// Dispatches secret lookups to the configured per-backend stores.
#[derive(Default)]
pub struct SecretResolver {
    aws: Option<Box<dyn SecretStore>>,
    azure: Option<Box<dyn SecretStore>>,
    gcp: Option<Box<dyn SecretStore>>,
}

impl SecretResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_aws(mut self, store: impl SecretStore + 'static) -> Self {
        self.aws = Some(Box::new(store));
        self
    }

    pub fn with_azure(mut self, store: impl SecretStore + 'static) -> Self {
        self.azure = Some(Box::new(store));
        self
    }

    pub fn with_gcp(mut self, store: impl SecretStore + 'static) -> Self {
        self.gcp = Some(Box::new(store));
        self
    }

    pub async fn fetch(&self, backend: SecretBackend, name: &str) -> Result<String> {
        let store = match backend {
            SecretBackend::Aws => self.aws.as_deref(),
            SecretBackend::Azure => self.azure.as_deref(),
            SecretBackend::Gcp => self.gcp.as_deref(),
        };

        match store {
            Some(store) => store.fetch(name).await,
            None => Err(BootstrapError::ConfigError {
                message: format!("No secret store configured for {}", backend.name()),
            }),
        }
    }
}
