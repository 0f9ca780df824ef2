//! Error types for dated.
//!
//! Every failure is surfaced synchronously to the calling operation. The cache
//! never retries, logs-and-continues, or swallows an error; fallback (such as
//! building a fresh resource on a miss) belongs to the caller.

use thiserror::Error;

/// Result type alias using `CacheError`.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Main error type for all cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    // ═══════════════════════════════════════════════════════════════════════════
    // LOOKUP ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// No entry exists for the requested key.
    #[error("No cached entry for key: {0}")]
    NotFound(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // CONFIGURATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// A TTL or sweep interval outside the accepted range.
    #[error("Invalid {field}: {value} ({reason})")]
    InvalidConfiguration {
        field: &'static str,
        value: u64,
        reason: String,
    },

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// File I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl CacheError {
    /// Creates a `NotFound` error for the given key.
    pub fn not_found(key: impl Into<String>) -> Self {
        CacheError::NotFound(key.into())
    }

    /// Returns true if the caller can recover, typically by building and
    /// inserting a fresh resource.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CacheError::NotFound(_))
    }

    /// Returns true if this is a configuration error.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            CacheError::InvalidConfiguration { .. }
                | CacheError::ConfigError(_)
                | CacheError::JsonError(_)
        )
    }
}
