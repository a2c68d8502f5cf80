use crate::config::Settings;
use crate::secrets::{SecretBackend, SecretStore};
use crate::utils::error::{BootstrapError, Result};
use crate::utils::retry::RetryPolicy;
use crate::utils::validation::validate_required_field;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

const DEFAULT_LOGIN_BASE_URL: &str = "https://login.microsoftonline.com";
const KEY_VAULT_API_VERSION: &str = "7.4";
const KEY_VAULT_SCOPE: &str = "https://vault.azure.net/.default";

/// Azure Key Vault secret store. Authenticates with an OAuth2
/// client-credentials grant against the tenant's login endpoint, then reads
/// secrets over the Key Vault REST API.
pub struct AzureKeyVault {
    http: reqwest::Client,
    vault_url: String,
    tenant_id: String,
    client_id: String,
    client_secret: String,
    login_base_url: String,
    scope: String,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct SecretBundle {
    value: String,
}

impl AzureKeyVault {
    pub fn new(
        vault_url: String,
        tenant_id: String,
        client_id: String,
        client_secret: String,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            vault_url: vault_url.trim_end_matches('/').to_string(),
            tenant_id,
            client_id,
            client_secret,
            login_base_url: DEFAULT_LOGIN_BASE_URL.to_string(),
            scope: KEY_VAULT_SCOPE.to_string(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self::new(
            validate_required_field("AZURE_KEY_VAULT_URL", &settings.azure_key_vault_url)?.clone(),
            validate_required_field("AZURE_TENANT_ID", &settings.azure_tenant_id)?.clone(),
            validate_required_field("AZURE_CLIENT_ID", &settings.azure_client_id)?.clone(),
            validate_required_field("AZURE_CLIENT_SECRET", &settings.azure_client_secret)?.clone(),
        ))
    }

    /// Overrides the AAD login endpoint, for tests.
    pub fn with_login_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.login_base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn access_token(&self) -> Result<String> {
        let token_url = format!(
            "{}/{}/oauth2/v2.0/token",
            self.login_base_url, self.tenant_id
        );

        let response = self
            .http
            .post(&token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("scope", self.scope.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(BootstrapError::SecretError {
                backend: SecretBackend::Azure.name().to_string(),
                name: "<token>".to_string(),
                message: format!("token request failed with status {}", response.status()),
            });
        }

        let token: TokenResponse = response.json().await?;
        Ok(token.access_token)
    }

    async fn fetch_once(&self, name: &str) -> Result<String> {
        let token = self.access_token().await?;
        let secret_url = format!(
            "{}/secrets/{}?api-version={}",
            self.vault_url, name, KEY_VAULT_API_VERSION
        );

        let response = self.http.get(&secret_url).bearer_auth(&token).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(BootstrapError::SecretNotFoundError {
                backend: SecretBackend::Azure.name().to_string(),
                name: name.to_string(),
            }),
            status if status.is_success() => {
                let bundle: SecretBundle = response.json().await?;
                tracing::debug!("Fetched secret from Azure Key Vault: {}", name);
                Ok(bundle.value)
            }
            status => Err(BootstrapError::SecretError {
                backend: SecretBackend::Azure.name().to_string(),
                name: name.to_string(),
                message: format!("request failed with status {}", status),
            }),
        }
    }
}

#[async_trait]
impl SecretStore for AzureKeyVault {
    async fn fetch(&self, name: &str) -> Result<String> {
        self.retry
            .run("azure key vault secret fetch", || self.fetch_once(name))
            .await
    }
}
