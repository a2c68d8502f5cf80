use crate::secrets::{SecretBackend, SecretStore};
use crate::utils::error::{BootstrapError, Result};
use crate::utils::retry::RetryPolicy;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_secretsmanager::Client;

/// AWS Secrets Manager store backed by the official SDK. Credentials come
/// from the default provider chain (environment, profile, instance role).
pub struct AwsSecrets {
    client: Client,
    retry: RetryPolicy,
}

impl AwsSecrets {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            retry: RetryPolicy::default(),
        }
    }

    pub async fn from_default_chain() -> Self {
        let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        Self::new(Client::new(&config))
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn fetch_once(&self, name: &str) -> Result<String> {
        let response = self
            .client
            .get_secret_value()
            .secret_id(name)
            .send()
            .await
            .map_err(|err| {
                let service_err = err.into_service_error();
                if service_err.is_resource_not_found_exception() {
                    BootstrapError::SecretNotFoundError {
                        backend: SecretBackend::Aws.name().to_string(),
                        name: name.to_string(),
                    }
                } else {
                    BootstrapError::SecretError {
                        backend: SecretBackend::Aws.name().to_string(),
                        name: name.to_string(),
                        message: service_err.to_string(),
                    }
                }
            })?;

        if let Some(value) = response.secret_string() {
            tracing::debug!("Fetched secret from AWS Secrets Manager: {}", name);
            return Ok(value.to_string());
        }

        if let Some(binary) = response.secret_binary() {
            let value = String::from_utf8(binary.as_ref().to_vec()).map_err(|e| {
                BootstrapError::SecretError {
                    backend: SecretBackend::Aws.name().to_string(),
                    name: name.to_string(),
                    message: format!("SecretBinary is not valid UTF-8: {}", e),
                }
            })?;
            tracing::debug!("Fetched binary secret from AWS Secrets Manager: {}", name);
            return Ok(value);
        }

        Err(BootstrapError::SecretError {
            backend: SecretBackend::Aws.name().to_string(),
            name: name.to_string(),
            message: "secret has no SecretString or SecretBinary".to_string(),
        })
    }
}

#[async_trait]
impl SecretStore for AwsSecrets {
    async fn fetch(&self, name: &str) -> Result<String> {
        self.retry
            .run("aws secrets manager fetch", || self.fetch_once(name))
            .await
    }
}
