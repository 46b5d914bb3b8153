//! Error types for the endpoint sync system
//!
//! Every steady-state failure is recoverable at the cycle level: it is
//! reported, the remainder of the cycle is skipped, and the next scheduled
//! cycle runs normally. Only `Config` is treated as fatal, and only during
//! daemon startup.

use thiserror::Error;

/// Result type alias for sync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the endpoint sync system
#[derive(Error, Debug)]
pub enum Error {
    /// DNS lookup failed (NXDOMAIN, timeout, transport error, empty answer)
    #[error("resolution error: {0}")]
    Resolution(String),

    /// Controller unreachable or login rejected
    #[error("connectivity error: {0}")]
    Connectivity(String),

    /// Named network absent from the controller's configuration list
    #[error("network not found: {0}")]
    NotFound(String),

    /// Replace request rejected or transport error mid-write
    #[error("commit error: {0}")]
    Commit(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a resolution error
    pub fn resolution(msg: impl Into<String>) -> Self {
        Self::Resolution(msg.into())
    }

    /// Create a connectivity error
    pub fn connectivity(msg: impl Into<String>) -> Self {
        Self::Connectivity(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a commit error
    pub fn commit(msg: impl Into<String>) -> Self {
        Self::Commit(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
