//! Error types module
//!
//! All fatal conditions across the workflows are unified under the
//! `AppError` enum. Every error aborts the current run; there is no
//! partial-success state and no automatic resumption.

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Required settings or credential fields missing or unreadable.
    /// Surfaced before any network call is made.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A credential was rejected by a collaborator service.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Transport-level failure (DNS, timeout, connection reset).
    /// Propagated as fatal; there is no automatic retry.
    #[error("Network error: {0}")]
    Network(String),

    /// A collaborator service returned a non-success status. The body is
    /// carried verbatim so the operator sees the provider's own detail.
    #[error("Provider rejected request (HTTP {status}): {body}")]
    Provider { status: u16, body: String },

    /// Asynchronous media processing reached the ERROR terminal state.
    /// Distinct from `Provider`: the triggering request itself succeeded.
    #[error("Processing failed: {0}")]
    Processing(String),

    /// A bounded wait ran out of attempts before a terminal state.
    #[error("Timed out after {attempts} attempts ({waited_secs}s) waiting for {operation}")]
    Timeout {
        operation: String,
        attempts: u32,
        waited_secs: u64,
    },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Network(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Config(format!("YAML parsing error: {}", err))
    }
}

/// Result type used across Postflow crates.
pub type AppResult<T> = Result<T, AppError>;
