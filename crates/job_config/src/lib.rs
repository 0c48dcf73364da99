//! Versioned job configuration for a CI system.
//!
//! Given a repository identifier and the commits under test, this crate
//! produces the jobs that apply to that exact code state. Jobs come from the
//! static cluster configuration and from configuration files inside the
//! repository itself; the latter are expensive to obtain and are cached per
//! `(identifier, base SHA, head SHAs)`.
//!
//! Defaults for decoration, job execution and rerun authorization are
//! registered as ordered precedence entries and resolved per repository and
//! cluster by [`resolve`].

use serde::{Deserialize, Serialize};

pub mod cache_key;
pub mod config;
pub mod errors;
pub mod in_repo;
pub mod jobs;
pub mod legacy;
pub mod merger;
pub mod resolver;
pub mod settings;
pub mod tide;
pub mod versioned_config;
pub mod versioned_config_cache;


// Re-export for convenient access
pub use cache_key::{make_cache_key_parts, CacheKey, CacheKeyParts, OnceRefGetter, RefGetter};
pub use config::{Config, DeckConfig, PlankConfig, StaticJobConfig, TideConfig};
pub use errors::{ConfigurationError, ConfigurationResult};
pub use in_repo::{candidate_keys, InRepoConfig, DEFAULT_CLUSTER};
pub use jobs::{Brancher, ChangeMatcher, ExtraRef, JobBase, Periodic, Postsubmit, Presubmit, Preset};
pub use legacy::{merge_legacy_entries, migrate_legacy_map};
pub use merger::{resolve, DefaultEntry, Overlay, WILDCARD};
pub use resolver::JobResolver;
pub use settings::{
    DecorationConfig, GcsConfiguration, GitHubTeamSlug, JobDefaults, PathStrategy,
    RerunAuthConfig, UtilityImages, DEFAULT_TENANT_ID,
};
pub use tide::{dedup_queries, TideQuery};
pub use versioned_config::{VersionedConfig, VersionedConfigLoader};
pub use versioned_config_cache::{CacheValue, SharedCache, VersionedConfigCache};

/// Effective defaults for one repository and cluster.
///
/// This is what the `resolve` command of the CLI prints and what a job
/// without settings of its own would receive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveDefaults {
    pub repo: String,
    pub cluster: String,
    pub decoration_config: DecorationConfig,
    pub job_defaults: JobDefaults,
    pub rerun_auth_config: RerunAuthConfig,
}

impl EffectiveDefaults {
    pub fn resolve(config: &Config, repo: &str, cluster: &str) -> Self {
        Self {
            repo: repo.to_string(),
            cluster: cluster.to_string(),
            decoration_config: config.decoration_for(repo, cluster, None),
            job_defaults: config.job_defaults_for(repo, cluster, None),
            rerun_auth_config: config.rerun_auth_for(repo, cluster, None),
        }
    }
}
