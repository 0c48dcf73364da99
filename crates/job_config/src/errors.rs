//! Configuration system error types.
//!
//! Domain-specific errors for deriving cache keys, loading versioned job
//! configuration, resolving defaults and validating jobs.

use config_cache::CacheError;
use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Configuration system errors.
///
/// Errors fall into three groups:
///
/// - input errors (`EmptyIdentifier`, `Cache`), returned before any work is done;
/// - construction errors (`RefLookupFailed`, `LoadFailed`, `ParseError`,
///   validation variants), handed verbatim to every caller waiting on the
///   failed construction and never cached;
/// - corruption errors (`WrongCacheValueType`), raised when a cached value is
///   not the type the reader expects.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Failed to access configuration file: {path} - {reason}")]
    FileAccessError { path: String, reason: String },

    #[error("Failed to parse configuration: {reason}")]
    ParseError { reason: String },

    #[error("Invalid configuration: {field} - {reason}")]
    InvalidConfiguration { field: String, reason: String },

    #[error("Configuration fields are mutually exclusive: '{legacy}' and '{current}' are both set")]
    ConflictingConfiguration { legacy: String, current: String },

    #[error("Identifier must not be empty")]
    EmptyIdentifier,

    #[error("Failed to get {reference} SHA: {source}")]
    RefLookupFailed {
        reference: String,
        source: Box<ConfigurationError>,
    },

    #[error("Failed to load versioned configuration for {identifier}: {reason}")]
    LoadFailed { identifier: String, reason: String },

    #[error("Cached value for {key} has the wrong type, expected {expected}")]
    WrongCacheValueType { key: String, expected: String },

    #[error("Job '{name}' is defined more than once for {repo}")]
    DuplicateJob { name: String, repo: String },

    #[error("Job '{job}' uses cluster '{cluster}' which is not allowed for {identifier}")]
    ClusterNotAllowed {
        job: String,
        cluster: String,
        identifier: String,
    },

    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Result type alias for configuration operations.
pub type ConfigurationResult<T> = Result<T, ConfigurationError>;
