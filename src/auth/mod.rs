//! Credential management
//!
//! Obtains and refreshes the OAuth access token, persisting refreshed values
//! back into the config file before they are used.

mod credential;

pub use credential::{token_needs_refresh, CredentialManager, REFRESH_TOKEN_BEFORE_DAYS};

#[cfg(test)]
mod tests;
