//! Error types for the application.

use thiserror::Error;

use crate::common::types::Platform;

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {message}")]
    ParseError { message: String },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

/// Connection errors raised by platform adapters.
///
/// `Auth` is terminal and requires operator intervention; `Network` and
/// `Timeout` are retried with exponential backoff.
#[derive(Debug, Error)]
pub enum ConnError {
    #[error("Authentication failed: {reason}")]
    Auth { reason: String },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Connection attempt timed out")]
    Timeout,
}

impl ConnError {
    /// Whether the connect loop should retry after this error.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ConnError::Auth { .. })
    }
}

/// Delivery errors raised by platform adapters.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("Target unreachable: {message}")]
    Unreachable { message: String },

    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("Client error: {message}")]
    Client { message: String },
}

/// Relay-level failures recorded against a message.
///
/// The display strings double as the persisted `relay_error` reasons,
/// so they must stay stable.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("no room mapping")]
    NoMapping,

    #[error("relay queue full")]
    QueueFull,

    #[error("shutdown")]
    Shutdown,

    #[error("{0}")]
    Delivery(String),
}

impl From<SendError> for RelayError {
    fn from(e: SendError) -> Self {
        RelayError::Delivery(e.to_string())
    }
}

/// Persistence repository errors.
///
/// Write failures are logged by callers and never roll back an
/// in-memory relay outcome.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Failed to open database '{path}': {message}")]
    Open { path: String, message: String },

    #[error("Database query failed: {message}")]
    Query { message: String },

    #[error("Record not found: {key}")]
    NotFound { key: String },
}

/// Raised when a protocol client library is not available at
/// construction time.
#[derive(Debug, Error)]
#[error("No {platform} client available: {reason}")]
pub struct UnavailableError {
    pub platform: Platform,
    pub reason: String,
}

/// Result type alias for connection operations.
pub type ConnResult<T> = std::result::Result<T, ConnError>;

/// Result type alias for delivery operations.
pub type SendResult<T> = std::result::Result<T, SendError>;

/// Result type alias for repository operations.
pub type StoreResult<T> = std::result::Result<T, PersistenceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_error_reasons_are_stable() {
        assert_eq!(RelayError::NoMapping.to_string(), "no room mapping");
        assert_eq!(RelayError::QueueFull.to_string(), "relay queue full");
        assert_eq!(RelayError::Shutdown.to_string(), "shutdown");
    }

    #[test]
    fn test_auth_errors_are_not_retryable() {
        let auth = ConnError::Auth {
            reason: "bad token".to_string(),
        };
        assert!(!auth.is_retryable());

        let network = ConnError::Network {
            message: "connection refused".to_string(),
        };
        assert!(network.is_retryable());
        assert!(ConnError::Timeout.is_retryable());
    }

    #[test]
    fn test_send_error_becomes_delivery_reason() {
        let err = SendError::Unreachable {
            message: "host down".to_string(),
        };
        let relay: RelayError = err.into();
        assert_eq!(relay.to_string(), "Target unreachable: host down");
    }
}
