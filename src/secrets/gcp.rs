use crate::config::Settings;
use crate::secrets::{SecretBackend, SecretStore};
use crate::utils::error::{BootstrapError, Result};
use crate::utils::retry::RetryPolicy;
use crate::utils::validation::validate_required_field;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::StatusCode;
use serde::Deserialize;

const DEFAULT_METADATA_BASE_URL: &str = "http://metadata.google.internal";
const DEFAULT_API_BASE_URL: &str = "https://secretmanager.googleapis.com";
const METADATA_TOKEN_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/token";

/// GCP Secret Manager store. Reads secret versions over the REST API,
/// authenticating with an access token from the instance metadata server
/// unless one is supplied directly.
pub struct GcpSecretManager {
    http: reqwest::Client,
    project_id: String,
    access_token: Option<String>,
    metadata_base_url: String,
    api_base_url: String,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct MetadataToken {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct AccessSecretVersionResponse {
    payload: SecretPayload,
}

#[derive(Debug, Deserialize)]
struct SecretPayload {
    data: String,
}

impl GcpSecretManager {
    pub fn new(project_id: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            project_id,
            access_token: None,
            metadata_base_url: DEFAULT_METADATA_BASE_URL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let project_id =
            validate_required_field("GOOGLE_CLOUD_PROJECT", &settings.google_cloud_project)?;
        Ok(Self::new(project_id.clone()))
    }

    /// Uses a fixed access token instead of the metadata server.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Overrides the metadata server base URL, for tests.
    pub fn with_metadata_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.metadata_base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Overrides the Secret Manager API base URL, for tests.
    pub fn with_api_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api_base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn access_token(&self) -> Result<String> {
        if let Some(token) = &self.access_token {
            return Ok(token.clone());
        }

        let token_url = format!("{}{}", self.metadata_base_url, METADATA_TOKEN_PATH);
        let response = self
            .http
            .get(&token_url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(BootstrapError::SecretError {
                backend: SecretBackend::Gcp.name().to_string(),
                name: "<token>".to_string(),
                message: format!(
                    "metadata token request failed with status {}",
                    response.status()
                ),
            });
        }

        let token: MetadataToken = response.json().await?;
        Ok(token.access_token)
    }

    async fn fetch_once(&self, name: &str) -> Result<String> {
        let token = self.access_token().await?;
        let secret_url = format!(
            "{}/v1/projects/{}/secrets/{}/versions/latest:access",
            self.api_base_url, self.project_id, name
        );

        let response = self.http.get(&secret_url).bearer_auth(&token).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(BootstrapError::SecretNotFoundError {
                backend: SecretBackend::Gcp.name().to_string(),
                name: name.to_string(),
            }),
            status if status.is_success() => {
                let body: AccessSecretVersionResponse = response.json().await?;
                let decoded = STANDARD.decode(&body.payload.data).map_err(|e| {
                    BootstrapError::SecretError {
                        backend: SecretBackend::Gcp.name().to_string(),
                        name: name.to_string(),
                        message: format!("payload is not valid base64: {}", e),
                    }
                })?;
                let value =
                    String::from_utf8(decoded).map_err(|e| BootstrapError::SecretError {
                        backend: SecretBackend::Gcp.name().to_string(),
                        name: name.to_string(),
                        message: format!("payload is not valid UTF-8: {}", e),
                    })?;
                tracing::debug!("Fetched secret from GCP Secret Manager: {}", name);
                Ok(value)
            }
            status => Err(BootstrapError::SecretError {
                backend: SecretBackend::Gcp.name().to_string(),
                name: name.to_string(),
                message: format!("request failed with status {}", status),
            }),
        }
    }
}

#[async_trait]
impl SecretStore for GcpSecretManager {
    async fn fetch(&self, name: &str) -> Result<String> {
        self.retry
            .run("gcp secret manager fetch", || self.fetch_once(name))
            .await
    }
}
