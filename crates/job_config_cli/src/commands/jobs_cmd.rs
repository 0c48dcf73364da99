//! Resolving the jobs that apply to a repository state.
//!
//! The in-repo configuration is read from a local directory standing in for
//! a checkout of the requested commits: every `*.toml` file in it, in name
//! order.
//!
//! # Examples
//!
//! ```bash
//! job-config jobs --identifier org/repo --base 1a2b3c --head 4d5e6f --in-repo-dir ./.ci
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use clap::Args;
use job_config::{
    Config, ConfigurationError, ConfigurationResult, JobResolver, Postsubmit, Presubmit,
    RefGetter, VersionedConfig, VersionedConfigCache, VersionedConfigLoader,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::commands::{render, OutputFormat};
use crate::errors::Error;

#[cfg(test)]
#[path = "jobs_cmd_tests.rs"]
mod tests;

#[derive(Args, Debug, Clone)]
pub struct JobsArgs {
    /// Repository identifier, org/repo or a URL
    #[arg(long)]
    pub identifier: String,

    /// Base commit SHA
    #[arg(long)]
    pub base: String,

    /// Head commit SHAs merged onto the base, in order
    #[arg(long = "head")]
    pub heads: Vec<String>,

    /// Directory holding the in-repo configuration files
    #[arg(long)]
    pub in_repo_dir: PathBuf,

    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

/// Jobs resolved for one repository state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobListing {
    pub identifier: String,
    pub presubmits: Vec<Presubmit>,
    pub postsubmits: Vec<Postsubmit>,
}

/// A SHA already known on the command line.
struct FixedSha(String);

#[async_trait]
impl RefGetter for FixedSha {
    async fn get(&self) -> ConfigurationResult<String> {
        Ok(self.0.clone())
    }
}

/// Reads in-repo configuration files from a directory.
#[derive(Debug, Clone)]
pub struct DirectoryLoader {
    dir: PathBuf,
}

impl DirectoryLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn load_failed(&self, identifier: &str, reason: impl ToString) -> ConfigurationError {
        ConfigurationError::LoadFailed {
            identifier: identifier.to_string(),
            reason: format!("{}: {}", self.dir.display(), reason.to_string()),
        }
    }
}

#[async_trait]
impl VersionedConfigLoader for DirectoryLoader {
    async fn load(
        &self,
        identifier: &str,
        base_sha: &str,
        head_shas: &[String],
    ) -> ConfigurationResult<VersionedConfig> {
        debug!(
            base_sha,
            heads = head_shas.len(),
            dir = %self.dir.display(),
            "Reading in-repo configuration"
        );

        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| self.load_failed(identifier, e))?;

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| self.load_failed(identifier, e))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "toml") {
                files.push(path);
            }
        }
        files.sort();

        let mut configs = Vec::with_capacity(files.len());
        for path in files {
            let content = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| self.load_failed(identifier, e))?;
            configs.push(VersionedConfig::from_toml_str(&content)?);
        }

        Ok(VersionedConfig::merge_all(configs))
    }
}

/// Resolves static and in-repo jobs and renders them.
#[instrument(skip(config, args), fields(identifier = %args.identifier))]
pub async fn list_jobs(config: Config, args: &JobsArgs) -> Result<String, Error> {
    let cache = VersionedConfigCache::new(Arc::new(config), 1)?;
    let resolver = JobResolver::new(cache, DirectoryLoader::new(&args.in_repo_dir));

    let base = FixedSha(args.base.clone());
    let heads: Vec<FixedSha> = args.heads.iter().cloned().map(FixedSha).collect();
    let head_refs: Vec<&dyn RefGetter> = heads.iter().map(|h| h as &dyn RefGetter).collect();

    let presubmits = resolver
        .presubmits(&args.identifier, &base, &head_refs)
        .await?;
    let postsubmits = resolver.postsubmits(&args.identifier, &base).await?;

    let listing = JobListing {
        identifier: args.identifier.clone(),
        presubmits,
        postsubmits,
    };
    render(&listing, args.format)
}
