//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache.
///
/// Cache operations themselves never fail: a missing key is reported as
/// `None`. These variants cover misuse and setup failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// A callback running under the write lock called back into the cache
    #[error("re-entrant lock: cache accessed from inside an atomic callback")]
    ReentrantLock,

    /// The background expiry thread could not be started
    #[error("Failed to start expiry timer: {0}")]
    TimerStart(String),

    /// Invalid configuration value
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
