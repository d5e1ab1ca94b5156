//! Error types for the OceanStor inventory layer
//!
//! Provides structured error types for inventory lookups, provisioning,
//! snapshot management and the REST transport underneath them.

use std::time::Duration;
use thiserror::Error;

/// Unified error type for the inventory layer
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Configuration error: {0}")]
    Configuration(String),

    // =========================================================================
    // Inventory Errors
    // =========================================================================
    #[error("{kind} not found: {name}")]
    NotFound { kind: String, name: String },

    #[error("{kind} already exists: {name}")]
    AlreadyExists { kind: String, name: String },

    #[error("Unexpected payload from {endpoint}: {reason}")]
    InvalidPayload { endpoint: String, reason: String },

    // =========================================================================
    // Remote API Errors
    // =========================================================================
    #[error("OceanStor API error on {endpoint}: status {status}: {description}")]
    Remote {
        endpoint: String,
        status: i64,
        description: String,
    },

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    // =========================================================================
    // Parse Errors
    // =========================================================================
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Action a caller should take after a failed operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    /// Retry with exponential backoff
    RetryWithBackoff,
    /// Retry after a fixed delay
    RetryAfter(Duration),
    /// Don't retry, the request itself is wrong
    NoRetry,
}

impl Error {
    /// Shorthand for a `NotFound` error
    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Error::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Determine what action to take for this error
    pub fn action(&self) -> ErrorAction {
        match self {
            Error::Transport(_) => ErrorAction::RetryWithBackoff,

            // HTTP-style server errors relayed by the array
            Error::Remote { status, .. } if (500..600).contains(status) => {
                ErrorAction::RetryAfter(Duration::from_secs(30))
            }

            Error::Configuration(_)
            | Error::NotFound { .. }
            | Error::AlreadyExists { .. }
            | Error::Remote { .. }
            | Error::InvalidPayload { .. }
            | Error::JsonParse(_)
            | Error::YamlParse(_) => ErrorAction::NoRetry,

            Error::Io(_) => ErrorAction::RetryWithBackoff,
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        !matches!(self.action(), ErrorAction::NoRetry)
    }

    /// Check if this error is transient
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Transport(_) => true,
            Error::Remote { status, .. } => (500..600).contains(status),
            _ => false,
        }
    }
}

/// Result type alias for the inventory layer
pub type Result<T> = std::result::Result<T, Error>;
