//! Command modules for the job-config CLI.
//!
//! - `inspect_cmd`: validation and inspection of the cluster configuration
//! - `jobs_cmd`: resolving the jobs that apply to a repository state

pub mod inspect_cmd;
pub mod jobs_cmd;

use clap::ValueEnum;
use serde::Serialize;

use crate::errors::Error;

/// Output format for structured command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Toml,
}

/// Renders `value` in the requested format.
pub fn render<T: Serialize>(value: &T, format: OutputFormat) -> Result<String, Error> {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(value).map_err(|e| Error::Render(e.to_string()))
        }
        OutputFormat::Toml => {
            toml::to_string_pretty(value).map_err(|e| Error::Render(e.to_string()))
        }
    }
}
