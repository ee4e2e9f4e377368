//! Core error types for calnotion-core.
//!
//! Adapters and the pipeline return [`CoreError`]; the workflow layer turns
//! every variant into a user-facing message instead of propagating it.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for calnotion-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// No usable credentials and no way to obtain them
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Non-2xx response from one of the external APIs
    #[error("{service} API error (HTTP {status}): {body}")]
    Remote {
        service: String,
        status: u16,
        body: String,
    },

    /// Unparseable JSON payload or date string supplied by the caller
    #[error("{0}")]
    MalformedInput(String),

    /// A required secret is missing
    #[error("{0}")]
    NotConfigured(String),

    /// OAuth-related errors
    #[error("OAuth error: {0}")]
    OAuth(#[from] OAuthError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Transport-level HTTP failures
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Build a [`CoreError::Remote`] from a failed response, consuming its body.
    pub async fn from_response(service: &str, resp: reqwest::Response) -> Self {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        CoreError::Remote {
            service: service.to_string(),
            status,
            body,
        }
    }
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// No home/config directory could be determined
    #[error("Could not determine configuration directory")]
    NoConfigDir,
}

/// OAuth-specific errors.
#[derive(Error, Debug)]
pub enum OAuthError {
    /// Authorization failed
    #[error("Authorization failed: {0}")]
    AuthorizationFailed(String),

    /// Token exchange failed
    #[error("Token exchange failed: {0}")]
    TokenExchangeFailed(String),

    /// Token refresh failed
    #[error("Token refresh failed: {0}")]
    TokenRefreshFailed(String),

    /// Invalid callback
    #[error("Invalid OAuth callback: {0}")]
    InvalidCallback(String),

    /// Credentials not configured
    #[error("OAuth credentials not configured for {service}")]
    CredentialsNotConfigured { service: String },

    /// Token storage backend failure
    #[error("Token store error: {0}")]
    Store(String),
}

impl From<keyring::Error> for OAuthError {
    fn from(err: keyring::Error) -> Self {
        OAuthError::Store(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_error_carries_status_and_body() {
        let err = CoreError::Remote {
            service: "Notion".into(),
            status: 400,
            body: "{\"message\":\"bad\"}".into(),
        };
        assert_eq!(
            err.to_string(),
            "Notion API error (HTTP 400): {\"message\":\"bad\"}"
        );
    }

    #[test]
    fn not_configured_displays_message_verbatim() {
        let err = CoreError::NotConfigured("Notion API key or database ID not configured.".into());
        assert_eq!(err.to_string(), "Notion API key or database ID not configured.");
    }

    #[test]
    fn oauth_error_converts_into_core_error() {
        let err: CoreError = OAuthError::CredentialsNotConfigured {
            service: "google".into(),
        }
        .into();
        assert!(matches!(err, CoreError::OAuth(_)));
    }
}
