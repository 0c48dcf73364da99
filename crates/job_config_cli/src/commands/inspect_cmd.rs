//! Inspection commands for the cluster configuration.
//!
//! # Examples
//!
//! ```bash
//! # Validate the configuration
//! job-config --config config.toml check
//!
//! # Show the defaults a job in org/repo on the build cluster receives
//! job-config resolve --repo org/repo --cluster build
//!
//! # Show whether in-repo configuration is honoured
//! job-config in-repo --identifier org/repo --cluster build
//! ```

use clap::Args;
use colored::Colorize;
use job_config::{Config, EffectiveDefaults};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::commands::{render, OutputFormat};
use crate::errors::Error;

#[cfg(test)]
#[path = "inspect_cmd_tests.rs"]
mod tests;

#[derive(Args, Debug, Clone)]
pub struct ResolveArgs {
    /// Repository as org/repo
    #[arg(long)]
    pub repo: String,

    /// Cluster the job would run on
    #[arg(long, default_value = job_config::DEFAULT_CLUSTER)]
    pub cluster: String,

    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

#[derive(Args, Debug, Clone)]
pub struct InRepoArgs {
    /// Repository identifier, org/repo or a URL
    #[arg(long)]
    pub identifier: String,

    /// Also check whether this cluster is allowed
    #[arg(long)]
    pub cluster: Option<String>,
}

/// In-repo configuration status of one identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InRepoStatus {
    pub identifier: String,
    pub enabled: bool,
    pub allowed_clusters: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_allowed: Option<bool>,
}

/// Summarises a loaded configuration.
pub fn check(config: &Config) -> String {
    let static_presubmits: usize = config.jobs.presubmits.values().map(Vec::len).sum();
    let static_postsubmits: usize = config.jobs.postsubmits.values().map(Vec::len).sum();

    let mut output = format!("{}\n", "✓ Configuration is valid".green().bold());
    output.push_str(&format!(
        "  Decoration default entries: {}\n",
        config.plank.default_decoration_config_entries.len()
    ));
    output.push_str(&format!(
        "  Job default entries: {}\n",
        config.plank.default_job_defaults_entries.len()
    ));
    output.push_str(&format!(
        "  Rerun auth entries: {}\n",
        config.deck.default_rerun_auth_configs.len()
    ));
    output.push_str(&format!("  Tide queries: {}\n", config.tide.queries.len()));
    output.push_str(&format!(
        "  Static presubmits: {} in {} repositories\n",
        static_presubmits,
        config.jobs.presubmits.len()
    ));
    output.push_str(&format!(
        "  Static postsubmits: {} in {} repositories\n",
        static_postsubmits,
        config.jobs.postsubmits.len()
    ));
    output.push_str(&format!("  Periodics: {}\n", config.jobs.periodics.len()));
    output
}

/// Renders the effective defaults for a repository and cluster.
#[instrument(skip(config))]
pub fn resolve_defaults(config: &Config, args: &ResolveArgs) -> Result<String, Error> {
    if !args.repo.contains('/') {
        return Err(Error::InvalidArguments(format!(
            "--repo must be org/repo, got '{}'",
            args.repo
        )));
    }

    let defaults = EffectiveDefaults::resolve(config, &args.repo, &args.cluster);
    render(&defaults, args.format)
}

pub fn in_repo_status(config: &Config, args: &InRepoArgs) -> InRepoStatus {
    let settings = &config.in_repo_config;
    InRepoStatus {
        identifier: args.identifier.clone(),
        enabled: settings.enabled(&args.identifier),
        allowed_clusters: settings.allowed_clusters_for(&args.identifier),
        cluster_allowed: args
            .cluster
            .as_deref()
            .map(|cluster| settings.allows_cluster(&args.identifier, cluster)),
    }
}

/// The merge-pool search strings, one per deduplicated query.
pub fn tide_queries(config: &Config) -> Vec<String> {
    config.tide.queries.iter().map(|q| q.query()).collect()
}
