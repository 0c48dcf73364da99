//! Static cluster configuration.
//!
//! [`Config`] is loaded once from TOML and then treated as an immutable
//! snapshot. Loading runs [`Config::finalize`], which migrates legacy default
//! maps, deduplicates merge-pool queries, fills in allow-list defaults and
//! defaults and validates every static job. In-repo jobs go through
//! [`Config::default_and_validate_versioned`] against the same snapshot.

use crate::errors::{ConfigurationError, ConfigurationResult};
use crate::in_repo::{strip_scheme, InRepoConfig, DEFAULT_CLUSTER};
use crate::jobs::{apply_presets, JobBase, Periodic, Postsubmit, Presubmit, Preset};
use crate::legacy::merge_legacy_entries;
use crate::merger::{resolve, DefaultEntry};
use crate::settings::{DecorationConfig, JobDefaults, RerunAuthConfig};
use crate::tide::{dedup_queries, TideQuery};
use crate::versioned_config::VersionedConfig;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

/// Job execution settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PlankConfig {
    /// Legacy decoration defaults keyed by `org`, `org/repo` or `*`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub default_decoration_configs: BTreeMap<String, DecorationConfig>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub default_decoration_config_entries: Vec<DefaultEntry<DecorationConfig>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub default_job_defaults_entries: Vec<DefaultEntry<JobDefaults>>,
}

/// Job dashboard settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DeckConfig {
    /// Legacy rerun policies keyed by `org`, `org/repo` or `*`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub rerun_auth_configs: BTreeMap<String, RerunAuthConfig>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub default_rerun_auth_configs: Vec<DefaultEntry<RerunAuthConfig>>,
}

/// Merge-pool settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TideConfig {
    #[serde(default)]
    pub queries: Vec<TideQuery>,
}

/// Jobs defined in the cluster configuration itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StaticJobConfig {
    #[serde(default)]
    pub presets: Vec<Preset>,

    /// Presubmits keyed by `org/repo`
    #[serde(default)]
    pub presubmits: BTreeMap<String, Vec<Presubmit>>,

    /// Postsubmits keyed by `org/repo`
    #[serde(default)]
    pub postsubmits: BTreeMap<String, Vec<Postsubmit>>,

    #[serde(default)]
    pub periodics: Vec<Periodic>,
}

/// Root of the static cluster configuration.
///
/// # Examples
///
/// ```rust
/// use job_config::Config;
///
/// let config = Config::from_toml_str(r#"
///     [[plank.default_decoration_config_entries]]
///     repo = "*"
///     config = { timeout_secs = 7200 }
///
///     [in_repo_config.enabled]
///     "org" = true
/// "#).unwrap();
///
/// assert!(config.in_repo_config.enabled("org/repo"));
/// assert_eq!(
///     config.decoration_for("org/repo", "default", None).timeout_secs,
///     Some(7200)
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Decorate jobs that do not say otherwise
    #[serde(default)]
    pub decorate_all_jobs: bool,

    #[serde(default)]
    pub plank: PlankConfig,

    #[serde(default)]
    pub deck: DeckConfig,

    #[serde(default)]
    pub in_repo_config: InRepoConfig,

    #[serde(default)]
    pub tide: TideConfig,

    #[serde(default)]
    pub jobs: StaticJobConfig,
}

impl Config {
    /// Loads and finalizes a configuration file.
    ///
    /// # Errors
    ///
    /// - `ConfigurationError::FileNotFound` if `path` does not exist
    /// - `ConfigurationError::FileAccessError` if it cannot be read
    /// - `ConfigurationError::ParseError` if it is not valid TOML for this type
    /// - any error raised by [`Config::finalize`]
    pub fn load(path: &Path) -> ConfigurationResult<Self> {
        debug!("Loading configuration from {:?}", path);

        if !path.exists() {
            return Err(ConfigurationError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let content =
            fs::read_to_string(path).map_err(|e| ConfigurationError::FileAccessError {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        let config = Self::from_toml_str(&content)?;
        info!(
            path = %path.display(),
            static_presubmit_repos = config.jobs.presubmits.len(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Parses and finalizes a configuration document.
    pub fn from_toml_str(content: &str) -> ConfigurationResult<Self> {
        let mut config: Config =
            toml::from_str(content).map_err(|e| ConfigurationError::ParseError {
                reason: e.to_string(),
            })?;
        config.finalize()?;
        Ok(config)
    }

    /// Brings a freshly parsed configuration into its usable form.
    ///
    /// Running it again on a finalized configuration changes nothing.
    pub fn finalize(&mut self) -> ConfigurationResult<()> {
        merge_legacy_entries(
            "plank.default_decoration_configs",
            &mut self.plank.default_decoration_configs,
            "plank.default_decoration_config_entries",
            &mut self.plank.default_decoration_config_entries,
        )?;
        merge_legacy_entries(
            "deck.rerun_auth_configs",
            &mut self.deck.rerun_auth_configs,
            "deck.default_rerun_auth_configs",
            &mut self.deck.default_rerun_auth_configs,
        )?;

        self.in_repo_config.apply_defaults();
        self.tide.queries = dedup_queries(&self.tide.queries)?;

        self.finalize_static_jobs()
    }

    fn finalize_static_jobs(&mut self) -> ConfigurationResult<()> {
        let mut jobs = std::mem::take(&mut self.jobs);
        let result = self.default_static_jobs(&mut jobs);
        self.jobs = jobs;
        result
    }

    fn default_static_jobs(&self, jobs: &mut StaticJobConfig) -> ConfigurationResult<()> {
        for (repo, presubmits) in jobs.presubmits.iter_mut() {
            for presubmit in presubmits.iter_mut() {
                self.default_presubmit(presubmit, repo, &jobs.presets)?;
            }
            ensure_unique(presubmits.iter().map(|p| p.base.name.as_str()), repo)?;
        }

        for (repo, postsubmits) in jobs.postsubmits.iter_mut() {
            for postsubmit in postsubmits.iter_mut() {
                self.default_postsubmit(postsubmit, repo, &jobs.presets)?;
            }
            ensure_unique(postsubmits.iter().map(|p| p.base.name.as_str()), repo)?;
        }

        for periodic in jobs.periodics.iter_mut() {
            apply_presets(&jobs.presets, &mut periodic.base)?;
            let repo = periodic.repo();
            self.default_job_base(&mut periodic.base, &repo);
            periodic.validate()?;
        }
        ensure_unique(
            jobs.periodics.iter().map(|p| p.base.name.as_str()),
            "periodics",
        )
    }

    /// Effective decoration for `repo` on `cluster`, with `own` applied last.
    pub fn decoration_for(
        &self,
        repo: &str,
        cluster: &str,
        own: Option<&DecorationConfig>,
    ) -> DecorationConfig {
        resolve(&self.plank.default_decoration_config_entries, repo, cluster, own)
    }

    /// Effective job defaults; the tenant falls back to the global default.
    pub fn job_defaults_for(
        &self,
        repo: &str,
        cluster: &str,
        own: Option<&JobDefaults>,
    ) -> JobDefaults {
        resolve(&self.plank.default_job_defaults_entries, repo, cluster, own)
            .with_default_tenant()
    }

    pub fn rerun_auth_for(
        &self,
        repo: &str,
        cluster: &str,
        own: Option<&RerunAuthConfig>,
    ) -> RerunAuthConfig {
        resolve(&self.deck.default_rerun_auth_configs, repo, cluster, own)
    }

    /// Applies cluster, decoration, job and rerun defaults to a job of `repo`.
    ///
    /// A rerun policy is only set when one resolves to something non-empty.
    pub fn default_job_base(&self, base: &mut JobBase, repo: &str) {
        if base.cluster.is_empty() {
            base.cluster = DEFAULT_CLUSTER.to_string();
        }
        if base.decorate.is_none() && self.decorate_all_jobs {
            base.decorate = Some(true);
        }
        if base.decorate == Some(true) {
            base.decoration_config = Some(self.decoration_for(
                repo,
                &base.cluster,
                base.decoration_config.as_ref(),
            ));
        }
        base.job_defaults = Some(self.job_defaults_for(
            repo,
            &base.cluster,
            base.job_defaults.as_ref(),
        ));
        base.rerun_auth_config = Some(self.rerun_auth_for(
            repo,
            &base.cluster,
            base.rerun_auth_config.as_ref(),
        ))
        .filter(|policy| !policy.is_empty());
    }

    fn default_presubmit(
        &self,
        presubmit: &mut Presubmit,
        repo: &str,
        presets: &[Preset],
    ) -> ConfigurationResult<()> {
        apply_presets(presets, &mut presubmit.base)?;
        self.default_job_base(&mut presubmit.base, repo);
        presubmit.apply_defaults();
        presubmit.validate()
    }

    fn default_postsubmit(
        &self,
        postsubmit: &mut Postsubmit,
        repo: &str,
        presets: &[Preset],
    ) -> ConfigurationResult<()> {
        apply_presets(presets, &mut postsubmit.base)?;
        self.default_job_base(&mut postsubmit.base, repo);
        postsubmit.validate()
    }

    /// Static presubmits for `identifier`.
    pub fn static_presubmits(&self, identifier: &str) -> &[Presubmit] {
        self.jobs
            .presubmits
            .get(strip_scheme(identifier))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Static postsubmits for `identifier`.
    pub fn static_postsubmits(&self, identifier: &str) -> &[Postsubmit] {
        self.jobs
            .postsubmits
            .get(strip_scheme(identifier))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Defaults and validates in-repo jobs loaded for `identifier`.
    ///
    /// Static and in-repo presets both apply. Every job must target a cluster
    /// allowed for the identifier, and job names must not collide with each
    /// other or with static jobs of the same repository.
    pub fn default_and_validate_versioned(
        &self,
        identifier: &str,
        versioned: &mut VersionedConfig,
    ) -> ConfigurationResult<()> {
        let repo = strip_scheme(identifier);
        let presets: Vec<Preset> = self
            .jobs
            .presets
            .iter()
            .chain(&versioned.presets)
            .cloned()
            .collect();

        for presubmit in versioned.presubmits.iter_mut() {
            self.default_presubmit(presubmit, repo, &presets)?;
            self.ensure_cluster_allowed(identifier, &presubmit.base)?;
        }
        for postsubmit in versioned.postsubmits.iter_mut() {
            self.default_postsubmit(postsubmit, repo, &presets)?;
            self.ensure_cluster_allowed(identifier, &postsubmit.base)?;
        }

        ensure_unique(
            self.static_presubmits(identifier)
                .iter()
                .chain(&versioned.presubmits)
                .map(|p| p.base.name.as_str()),
            repo,
        )?;
        ensure_unique(
            self.static_postsubmits(identifier)
                .iter()
                .chain(&versioned.postsubmits)
                .map(|p| p.base.name.as_str()),
            repo,
        )?;

        debug!(
            identifier,
            presubmits = versioned.presubmits.len(),
            postsubmits = versioned.postsubmits.len(),
            "Defaulted in-repo configuration"
        );
        Ok(())
    }

    fn ensure_cluster_allowed(&self, identifier: &str, base: &JobBase) -> ConfigurationResult<()> {
        if self.in_repo_config.allows_cluster(identifier, &base.cluster) {
            return Ok(());
        }
        Err(ConfigurationError::ClusterNotAllowed {
            job: base.name.clone(),
            cluster: base.cluster.clone(),
            identifier: identifier.to_string(),
        })
    }
}

fn ensure_unique<'a>(
    names: impl Iterator<Item = &'a str>,
    repo: &str,
) -> ConfigurationResult<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(ConfigurationError::DuplicateJob {
                name: name.to_string(),
                repo: repo.to_string(),
            });
        }
    }
    Ok(())
}
