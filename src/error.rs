//! Error types for square-tap
//!
//! All public APIs return `Result<T, Error>` where Error is defined here.
//! Retry classification lives on the error type so the backoff loop in
//! `http::retry` stays a pure control-flow concern.

use thiserror::Error;

/// The main error type for square-tap
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Authentication Errors
    // ============================================================================
    #[error("Token refresh failed: {message}")]
    TokenRefresh { message: String },

    #[error("Invalid timestamp '{value}': {message}")]
    Timestamp { value: String, message: String },

    // ============================================================================
    // HTTP Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Api { status: u16, body: String },

    // ============================================================================
    // State Errors
    // ============================================================================
    #[error("State error: {message}")]
    State { message: String },

    #[error("Unknown stream: {stream}")]
    UnknownStream { stream: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Upstream outage signatures that warrant a retry even when the status code
/// alone would not. Kept byte-for-byte compatible with the upstream provider's
/// observed failure modes.
const RETRYABLE_SIGNATURES: &[&str] = &[
    "Service Unavailable",
    "upstream connect error or disconnect/reset before headers",
    "<span class=\"cf-error-code\">1101</span>",
];

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an API error from a status code and response body
    pub fn api(status: u16, body: impl Into<String>) -> Self {
        Self::Api {
            status,
            body: body.into(),
        }
    }

    /// Create a token refresh error
    pub fn token_refresh(message: impl Into<String>) -> Self {
        Self::TokenRefresh {
            message: message.into(),
        }
    }

    /// Create a state error
    pub fn state(message: impl Into<String>) -> Self {
        Self::State {
            message: message.into(),
        }
    }

    /// Classify this error for the retry loop.
    ///
    /// 400 and 401 are never retried, regardless of the response body. After
    /// that, the body is matched against known upstream outage signatures
    /// (including whole HTML error pages), then 429 and 5xx retry on status
    /// alone. Transport-level failures (connect, timeout, request) are
    /// retryable; a 2xx response whose body fails to decode is not, since a
    /// malformed payload does not heal on replay. Everything else is fatal.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Api { status, body } => {
                if matches!(status, 400 | 401) {
                    return false;
                }
                if RETRYABLE_SIGNATURES.iter().any(|sig| body.contains(sig))
                    || body.starts_with("<!DOCTYPE html>")
                {
                    return true;
                }
                *status == 429 || *status >= 500
            }
            Error::Http(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            _ => false,
        }
    }
}

/// Result type alias for square-tap
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config("test message");
        assert_eq!(err.to_string(), "Configuration error: test message");

        let err = Error::missing_field("client_id");
        assert_eq!(err.to_string(), "Missing required config field: client_id");

        let err = Error::api(404, "Not found");
        assert_eq!(err.to_string(), "HTTP 404: Not found");
    }

    #[test]
    fn test_status_codes_retryable() {
        assert!(Error::api(429, "").is_retryable());
        assert!(Error::api(500, "").is_retryable());
        assert!(Error::api(502, "").is_retryable());
        assert!(Error::api(503, "whatever went wrong").is_retryable());

        assert!(!Error::api(404, "").is_retryable());
        assert!(!Error::api(403, "").is_retryable());
    }

    #[test]
    fn test_outage_signatures_retryable() {
        assert!(Error::api(200, "Service Unavailable").is_retryable());
        assert!(Error::api(
            404,
            "upstream connect error or disconnect/reset before headers"
        )
        .is_retryable());
        assert!(Error::api(403, "<span class=\"cf-error-code\">1101</span>").is_retryable());
        assert!(Error::api(403, "<!DOCTYPE html><html>blocked</html>").is_retryable());
        // Doctype must be a prefix, not a substring
        assert!(!Error::api(403, "prefix <!DOCTYPE html>").is_retryable());
    }

    #[test]
    fn test_400_401_short_circuit() {
        // Even a matching body never retries on 400/401
        assert!(!Error::api(401, "Service Unavailable").is_retryable());
        assert!(!Error::api(400, "<!DOCTYPE html>").is_retryable());
        assert!(!Error::api(401, "").is_retryable());
    }

    #[test]
    fn test_non_api_errors() {
        assert!(!Error::config("test").is_retryable());
        assert!(!Error::token_refresh("denied").is_retryable());
        assert!(!Error::state("bad bookmark").is_retryable());
    }
}
