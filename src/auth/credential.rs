//! Access token lifecycle
//!
//! A credential is never mutated in place: a refresh yields a brand-new
//! access/refresh pair which fully replaces the old one and is written to the
//! config file synchronously before the access token is handed out.

use crate::config::{Environment, TapConfig};
use crate::error::{Error, Result};
use crate::http::timed;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;
use tracing::{error, info};

/// Tokens within this many days of expiry are refreshed eagerly
pub const REFRESH_TOKEN_BEFORE_DAYS: i64 = 22;

/// True when the token expires within [`REFRESH_TOKEN_BEFORE_DAYS`] of `now`.
/// Boundary inclusive: exactly 22 days out still refreshes.
pub fn token_needs_refresh(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    (expires_at - now).num_days() <= REFRESH_TOKEN_BEFORE_DAYS
}

/// Manages the OAuth access token for one environment
pub struct CredentialManager {
    http: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct TokenStatus {
    expires_at: String,
}

#[derive(Debug, Deserialize)]
struct ObtainTokenResponse {
    access_token: String,
    refresh_token: String,
}

impl CredentialManager {
    /// Credential manager for the given environment
    pub fn new(environment: Environment) -> Self {
        Self::with_base_url(environment.base_url())
    }

    /// Credential manager against an explicit base URL (tests point this at
    /// a mock server)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("square-tap/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("reqwest client construction cannot fail with static config");

        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Return a valid access token, refreshing and persisting a new pair
    /// when the cached one is absent, invalid, or near expiry.
    pub async fn ensure_valid_credential(
        &self,
        config: &mut TapConfig,
        config_path: impl AsRef<Path>,
    ) -> Result<String> {
        if !self
            .require_new_access_token(config.access_token.as_deref())
            .await
        {
            if let Some(token) = config.access_token.clone() {
                return Ok(token);
            }
        }

        info!("Refreshing access token...");
        let refreshed = self.obtain_token(config).await?;
        config.write_tokens(
            config_path,
            refreshed.access_token.clone(),
            refreshed.refresh_token,
        )?;

        Ok(refreshed.access_token)
    }

    /// Decide whether the cached access token must be replaced: absent or
    /// empty tokens always refresh, a failing status check refreshes, and a
    /// valid token refreshes once it is within 22 days of expiry.
    pub async fn require_new_access_token(&self, access_token: Option<&str>) -> bool {
        let Some(token) = access_token else {
            return true;
        };
        if token.is_empty() {
            return true;
        }

        let status = timed(
            "Check access token expiry",
            self.retrieve_token_status(token),
        )
        .await;

        match status {
            Ok(expires_at) => token_needs_refresh(expires_at, Utc::now()),
            Err(err) => {
                error!("{err}");
                true
            }
        }
    }

    /// Query the platform's token-status endpoint for the expiry timestamp
    async fn retrieve_token_status(&self, access_token: &str) -> Result<DateTime<Utc>> {
        let url = format!("{}/oauth2/token/status", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .header("content-type", "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::api(status.as_u16(), body));
        }

        let body: TokenStatus = response.json().await.map_err(Error::Http)?;
        DateTime::parse_from_rfc3339(&body.expires_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| Error::Timestamp {
                value: body.expires_at,
                message: e.to_string(),
            })
    }

    /// Exchange the refresh token for a new access/refresh pair. Any error
    /// response is fatal and carries the provider's payload.
    async fn obtain_token(&self, config: &TapConfig) -> Result<ObtainTokenResponse> {
        let body = json!({
            "client_id": config.client_id,
            "client_secret": config.client_secret,
            "grant_type": "refresh_token",
            "refresh_token": config.refresh_token,
        });

        let url = format!("{}/oauth2/token", self.base_url);
        let response = timed("GET access token", async {
            self.http
                .post(&url)
                .header("content-type", "application/json")
                .json(&body)
                .send()
                .await
                .map_err(Error::Http)
        })
        .await?;

        let status = response.status();
        if !status.is_success() {
            let payload = response.text().await.unwrap_or_default();
            let message = extract_error_payload(&payload);
            return Err(Error::token_refresh(message));
        }

        response.json().await.map_err(Error::Http)
    }
}

/// Prefer the provider's structured `errors` field when present, otherwise
/// pass the body through as-is.
fn extract_error_payload(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        if let Some(errors) = value.get("errors") {
            if !errors.is_null() {
                return errors.to_string();
            }
        }
    }
    body.to_string()
}
