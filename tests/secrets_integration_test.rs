use anyhow::Result;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use httpmock::prelude::*;
use std::time::Duration;
use svc_bootstrap::secrets::SecretStore;
use svc_bootstrap::{AzureKeyVault, BootstrapError, GcpSecretManager, RetryPolicy};

fn single_attempt() -> RetryPolicy {
    RetryPolicy::new(1, Duration::from_millis(1), 2.0)
}

#[tokio::test]
async fn test_azure_fetch_uses_client_credentials_token() -> Result<()> {
    let server = MockServer::start();

    let token_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/test-tenant/oauth2/v2.0/token")
            .body_contains("grant_type=client_credentials")
            .body_contains("client_id=test-client");
        then.status(200).json_body(serde_json::json!({
            "access_token": "vault_token_123",
            "token_type": "Bearer",
            "expires_in": 3600
        }));
    });

    let secret_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/secrets/db-password")
            .query_param("api-version", "7.4")
            .header("authorization", "Bearer vault_token_123");
        then.status(200).json_body(serde_json::json!({
            "value": "hunter2",
            "id": "https://vault/secrets/db-password/abc"
        }));
    });

    let store = AzureKeyVault::new(
        server.base_url(),
        "test-tenant".to_string(),
        "test-client".to_string(),
        "test-secret".to_string(),
    )
    .with_login_base_url(server.base_url())
    .with_retry_policy(single_attempt());

    let value = store.fetch("db-password").await?;
    assert_eq!(value, "hunter2");

    token_mock.assert();
    secret_mock.assert();
    Ok(())
}

#[tokio::test]
async fn test_azure_missing_secret_maps_to_not_found() {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(POST).path("/t/oauth2/v2.0/token");
        then.status(200)
            .json_body(serde_json::json!({"access_token": "tok"}));
    });

    server.mock(|when, then| {
        when.method(GET).path("/secrets/missing");
        then.status(404).json_body(serde_json::json!({
            "error": {"code": "SecretNotFound"}
        }));
    });

    let store = AzureKeyVault::new(
        server.base_url(),
        "t".to_string(),
        "c".to_string(),
        "s".to_string(),
    )
    .with_login_base_url(server.base_url())
    .with_retry_policy(single_attempt());

    let err = store.fetch("missing").await.unwrap_err();
    assert!(matches!(err, BootstrapError::SecretNotFoundError { .. }));
    assert!(err.to_string().contains("missing"));
}

#[tokio::test]
async fn test_azure_server_errors_are_retried() {
    let server = MockServer::start();

    let token_mock = server.mock(|when, then| {
        when.method(POST).path("/t/oauth2/v2.0/token");
        then.status(200)
            .json_body(serde_json::json!({"access_token": "tok"}));
    });

    let failing_mock = server.mock(|when, then| {
        when.method(GET).path("/secrets/flaky");
        then.status(500);
    });

    let store = AzureKeyVault::new(
        server.base_url(),
        "t".to_string(),
        "c".to_string(),
        "s".to_string(),
    )
    .with_login_base_url(server.base_url())
    .with_retry_policy(RetryPolicy::new(3, Duration::from_millis(1), 2.0));

    let err = store.fetch("flaky").await.unwrap_err();
    assert!(matches!(err, BootstrapError::SecretError { .. }));
    assert_eq!(failing_mock.hits(), 3);
    assert_eq!(token_mock.hits(), 3);
}

#[tokio::test]
async fn test_gcp_fetch_via_metadata_token_decodes_payload() -> Result<()> {
    let server = MockServer::start();

    let metadata_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/computeMetadata/v1/instance/service-accounts/default/token")
            .header("Metadata-Flavor", "Google");
        then.status(200).json_body(serde_json::json!({
            "access_token": "gcp_token_456",
            "expires_in": 3599,
            "token_type": "Bearer"
        }));
    });

    let secret_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/v1/projects/my-project/secrets/api-key/versions/latest:access")
            .header("authorization", "Bearer gcp_token_456");
        then.status(200).json_body(serde_json::json!({
            "name": "projects/my-project/secrets/api-key/versions/1",
            "payload": {"data": STANDARD.encode("top-secret")}
        }));
    });

    let store = GcpSecretManager::new("my-project".to_string())
        .with_metadata_base_url(server.base_url())
        .with_api_base_url(server.base_url())
        .with_retry_policy(single_attempt());

    let value = store.fetch("api-key").await?;
    assert_eq!(value, "top-secret");

    metadata_mock.assert();
    secret_mock.assert();
    Ok(())
}

#[tokio::test]
async fn test_gcp_explicit_token_skips_metadata_server() -> Result<()> {
    let server = MockServer::start();

    let secret_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/v1/projects/p/secrets/name/versions/latest:access")
            .header("authorization", "Bearer provided-token");
        then.status(200).json_body(serde_json::json!({
            "payload": {"data": STANDARD.encode("value")}
        }));
    });

    // No metadata base URL override: a metadata call would fail loudly.
    let store = GcpSecretManager::new("p".to_string())
        .with_access_token("provided-token")
        .with_api_base_url(server.base_url())
        .with_retry_policy(single_attempt());

    let value = store.fetch("name").await?;
    assert_eq!(value, "value");
    secret_mock.assert();
    Ok(())
}

#[tokio::test]
async fn test_gcp_invalid_base64_payload_is_an_error() {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(GET)
            .path("/v1/projects/p/secrets/bad/versions/latest:access");
        then.status(200).json_body(serde_json::json!({
            "payload": {"data": "not-base64!!!"}
        }));
    });

    let store = GcpSecretManager::new("p".to_string())
        .with_access_token("tok")
        .with_api_base_url(server.base_url())
        .with_retry_policy(single_attempt());

    let err = store.fetch("bad").await.unwrap_err();
    assert!(err.to_string().contains("base64"));
}

#[tokio::test]
async fn test_gcp_missing_secret_maps_to_not_found() {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(GET)
            .path("/v1/projects/p/secrets/gone/versions/latest:access");
        then.status(404);
    });

    let store = GcpSecretManager::new("p".to_string())
        .with_access_token("tok")
        .with_api_base_url(server.base_url())
        .with_retry_policy(single_attempt());

    let err = store.fetch("gone").await.unwrap_err();
    assert!(matches!(err, BootstrapError::SecretNotFoundError { .. }));
}
