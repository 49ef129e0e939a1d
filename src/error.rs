//! Muninn error types

use std::sync::Arc;

/// Muninn error types
#[derive(Debug, thiserror::Error)]
pub enum MuninnError {
    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A cache factory failed while the registry was building a
    /// per-function cache. Nothing was stored under the fingerprint.
    #[error("cache factory failed: {0}")]
    CacheFactory(#[source] Arc<MuninnError>),

    // Registry errors
    #[error("cache for fingerprint {fingerprint} holds different key/value types")]
    CacheTypeMismatch { fingerprint: String },

    // Data errors
    #[error("invalid fingerprint: {0}")]
    InvalidFingerprint(String),
}

impl MuninnError {
    /// Shorthand for a [`MuninnError::Configuration`] error.
    pub fn config(message: impl Into<String>) -> Self {
        MuninnError::Configuration(message.into())
    }
}

impl From<hex::FromHexError> for MuninnError {
    fn from(err: hex::FromHexError) -> Self {
        MuninnError::InvalidFingerprint(err.to_string())
    }
}

/// Result type alias for Muninn operations
pub type Result<T> = std::result::Result<T, MuninnError>;
