use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the frontend core.
///
/// Only transport-level faults live here; every request-format, routing,
/// authorization and validation condition is answered in-band with an API
/// status string and never propagates past its handler.
#[derive(Error, Debug)]
pub enum ApiError {
    // Network-related errors
    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Connection error: {message}")]
    Connection {
        message: String,
        remote_addr: Option<std::net::SocketAddr>,
    },

    #[error("Connection idle for {timeout:?}")]
    IdleTimeout { timeout: Duration },

    // Protocol-related errors
    #[error("Malformed HTTP request: {message}")]
    Parse { message: String },

    #[error("Request head exceeds the receive buffer: {size} bytes")]
    HeadTooLarge { size: usize },

    #[error("Request body too large: {size} bytes (max: {max} bytes)")]
    BodyTooLarge { size: usize, max: usize },

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Configuration-specific errors
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid duration: {field} = {duration:?} (must be > 0)")]
    InvalidDuration { field: String, duration: Duration },

    #[error("Invalid value: {field} - {message}")]
    InvalidValue { field: String, message: String },

    #[error("Duplicate coin: {name}")]
    DuplicateCoin { name: String },

    #[error("Instance {instance} references unknown coin: {coin}")]
    UnknownInstanceCoin { instance: String, coin: String },

    #[error("Invalid configuration format: {message}")]
    InvalidFormat { message: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

impl ApiError {
    /// Whether the peer simply went away, as opposed to a fault worth logging
    /// at error level.
    pub fn is_peer_disconnect(&self) -> bool {
        matches!(
            self,
            ApiError::Network { .. } | ApiError::Connection { .. } | ApiError::IdleTimeout { .. }
        )
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::Network {
            message: err.to_string(),
        }
    }
}

/// Result type alias for the frontend
pub type Result<T> = std::result::Result<T, ApiError>;
