//! Tests for credential management

use super::*;
use crate::config::TapConfig;
use crate::error::Error;
use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_with_token(access_token: Option<&str>) -> TapConfig {
    serde_json::from_value(serde_json::json!({
        "refresh_token": "rt-old",
        "client_id": "cid",
        "client_secret": "secret",
        "access_token": access_token,
        "custom_key": "keep-me"
    }))
    .unwrap()
}

#[test]
fn test_token_needs_refresh_boundaries() {
    let now = Utc::now();

    // 30 days out: still fine
    assert!(!token_needs_refresh(now + Duration::days(30), now));
    // Exactly 22 days out: boundary is inclusive
    assert!(token_needs_refresh(now + Duration::days(22), now));
    // Inside the window
    assert!(token_needs_refresh(now + Duration::days(10), now));
    // Already expired
    assert!(token_needs_refresh(now - Duration::days(1), now));
}

#[tokio::test]
async fn test_require_new_when_token_absent_or_empty() {
    // No server involved: absent and empty short-circuit
    let manager = CredentialManager::with_base_url("http://127.0.0.1:1");
    assert!(manager.require_new_access_token(None).await);
    assert!(manager.require_new_access_token(Some("")).await);
}

#[tokio::test]
async fn test_require_new_when_status_check_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/token/status"))
        .respond_with(ResponseTemplate::new(500).set_body_string("nope"))
        .mount(&mock_server)
        .await;

    let manager = CredentialManager::with_base_url(mock_server.uri());
    assert!(manager.require_new_access_token(Some("at-1")).await);
}

#[tokio::test]
async fn test_require_new_tracks_expiry_window() {
    let mock_server = MockServer::start().await;
    let far = (Utc::now() + Duration::days(60)).to_rfc3339();

    Mock::given(method("POST"))
        .and(path("/oauth2/token/status"))
        .and(header("authorization", "Bearer at-1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "expires_at": far })),
        )
        .mount(&mock_server)
        .await;

    let manager = CredentialManager::with_base_url(mock_server.uri());
    assert!(!manager.require_new_access_token(Some("at-1")).await);
}

#[tokio::test]
async fn test_ensure_valid_credential_keeps_fresh_token() {
    let mock_server = MockServer::start().await;
    let far = (Utc::now() + Duration::days(60)).to_rfc3339();

    Mock::given(method("POST"))
        .and(path("/oauth2/token/status"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "expires_at": far })),
        )
        .mount(&mock_server)
        .await;

    // The refresh endpoint must never be hit
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.json");
    let mut config = config_with_token(Some("at-fresh"));

    let manager = CredentialManager::with_base_url(mock_server.uri());
    let token = manager
        .ensure_valid_credential(&mut config, &config_path)
        .await
        .unwrap();

    assert_eq!(token, "at-fresh");
    // No rewrite happened
    assert!(!config_path.exists());
}

#[tokio::test]
async fn test_ensure_valid_credential_refreshes_and_persists() {
    let mock_server = MockServer::start().await;
    let near = (Utc::now() + Duration::days(5)).to_rfc3339();

    Mock::given(method("POST"))
        .and(path("/oauth2/token/status"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "expires_at": near })),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(body_json(serde_json::json!({
            "client_id": "cid",
            "client_secret": "secret",
            "grant_type": "refresh_token",
            "refresh_token": "rt-old",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "at-new",
            "refresh_token": "rt-new",
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.json");
    let mut config = config_with_token(Some("at-stale"));

    let manager = CredentialManager::with_base_url(mock_server.uri());
    let token = manager
        .ensure_valid_credential(&mut config, &config_path)
        .await
        .unwrap();

    assert_eq!(token, "at-new");

    // Persisted before use, with the whole pair replaced and unrelated keys intact
    let reloaded = TapConfig::load(&config_path).unwrap();
    assert_eq!(reloaded.access_token.as_deref(), Some("at-new"));
    assert_eq!(reloaded.refresh_token, "rt-new");
    assert_eq!(
        reloaded.extra.get("custom_key"),
        Some(&serde_json::Value::String("keep-me".to_string()))
    );
}

#[tokio::test]
async fn test_refresh_failure_is_fatal_with_provider_payload() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "errors": [{"code": "INVALID_GRANT", "detail": "refresh token revoked"}]
        })))
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.json");
    // Absent access token forces a refresh without a status check
    let mut config = config_with_token(None);

    let manager = CredentialManager::with_base_url(mock_server.uri());
    let err = manager
        .ensure_valid_credential(&mut config, &config_path)
        .await
        .unwrap_err();

    match err {
        Error::TokenRefresh { message } => {
            assert!(message.contains("INVALID_GRANT"));
            assert!(message.contains("refresh token revoked"));
        }
        other => panic!("expected TokenRefresh, got {other:?}"),
    }
    assert!(!config_path.exists());
}
