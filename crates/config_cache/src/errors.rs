//! Cache error types.

use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors raised by the cache itself.
///
/// Failures of the key or value constructors are not represented here; they
/// are returned to the caller exactly as the constructor produced them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache capacity must be a positive integer, got {capacity}")]
    InvalidCapacity { capacity: usize },
}

/// Result type alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;
