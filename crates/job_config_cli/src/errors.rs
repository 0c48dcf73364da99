use job_config::ConfigurationError;
use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors that can occur in the job-config CLI.
#[derive(Error, Debug)]
pub enum Error {
    /// The cluster configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Invalid command-line arguments were provided.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Output could not be rendered in the requested format.
    #[error("Failed to render output: {0}")]
    Render(String),
}
