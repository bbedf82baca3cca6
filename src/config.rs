//! Tap configuration
//!
//! The config file is plain JSON. Besides the fields this crate understands,
//! operators keep arbitrary keys in the same file (schedules, warehouse
//! coordinates, ...), so the token rewrite must round-trip everything it did
//! not touch. Unknown keys are captured through `#[serde(flatten)]` and
//! written back verbatim.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// Which Square environment to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Production,
    Sandbox,
}

impl Environment {
    /// API base URL for this environment
    pub fn base_url(self) -> &'static str {
        match self {
            Environment::Production => "https://connect.squareup.com",
            Environment::Sandbox => "https://connect.squareupsandbox.com",
        }
    }
}

/// Connector configuration loaded from the operator's JSON file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TapConfig {
    pub refresh_token: String,
    pub client_id: String,
    pub client_secret: String,

    /// The literal string "true" selects the sandbox environment; anything
    /// else (or absence) is production.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sandbox: Option<String>,

    /// Cached bearer token from a previous run, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// Replication start for streams with a time window
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,

    /// Keys this crate does not interpret but must not lose on rewrite
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TapConfig {
    /// Load config from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: TapConfig = serde_json::from_str(&contents)
            .map_err(|e| Error::config(format!("failed to parse config file: {e}")))?;
        Ok(config)
    }

    /// Selected environment
    pub fn environment(&self) -> Environment {
        if self.sandbox.as_deref() == Some("true") {
            Environment::Sandbox
        } else {
            Environment::Production
        }
    }

    /// Merge a refreshed token pair into the config and overwrite the config
    /// file, pretty-printed. The write happens synchronously so the new pair
    /// is durable before the access token is ever used; a crash after refresh
    /// but before persistence would orphan the old refresh token.
    pub fn write_tokens(
        &mut self,
        path: impl AsRef<Path>,
        access_token: String,
        refresh_token: String,
    ) -> Result<()> {
        self.access_token = Some(access_token);
        self.refresh_token = refresh_token;
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), contents)?;
        Ok(())
    }
}
