//! Job definitions.
//!
//! Jobs come from two places: the static cluster configuration and the
//! in-repo configuration of the repository under test. Both share
//! [`JobBase`]; the trigger-specific types add when the job runs.

use crate::errors::{ConfigurationError, ConfigurationResult};
use crate::settings::{DecorationConfig, JobDefaults, RerunAuthConfig};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

#[cfg(test)]
#[path = "jobs_tests.rs"]
mod tests;

/// Fields shared by every kind of job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct JobBase {
    pub name: String,

    /// Cluster the job runs on; empty means the default cluster
    #[serde(default)]
    pub cluster: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// Whether to inject the utility containers; unset defers to the cluster
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decorate: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decoration_config: Option<DecorationConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_defaults: Option<JobDefaults>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rerun_auth_config: Option<RerunAuthConfig>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,

    /// Maximum concurrently running instances; zero means unlimited
    #[serde(default)]
    pub max_concurrency: u32,
}

impl JobBase {
    /// Checks the parts of a job that do not depend on where it came from.
    pub fn validate(&self) -> ConfigurationResult<()> {
        if self.name.is_empty() {
            return Err(ConfigurationError::InvalidConfiguration {
                field: "name".to_string(),
                reason: "job name must not be empty".to_string(),
            });
        }
        if self.decorate == Some(true) {
            if let Some(decoration) = &self.decoration_config {
                decoration.validate()?;
            }
        }
        Ok(())
    }
}

/// Compiled regular expressions of a job, filled in once.
///
/// Carries no configuration of its own, so serde skips it and equality
/// ignores it.
#[derive(Debug, Clone)]
struct RegexCache<T>(OnceLock<T>);

impl<T> Default for RegexCache<T> {
    fn default() -> Self {
        Self(OnceLock::new())
    }
}

impl<T> PartialEq for RegexCache<T> {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl<T> Eq for RegexCache<T> {}

impl<T> RegexCache<T> {
    /// Stores `compiled` unless a value is already present.
    fn store(&self, compiled: T) {
        // A value compiled from the same patterns may already be present.
        let _ = self.0.set(compiled);
    }
}

#[derive(Debug, Clone)]
struct CompiledBranches {
    branches: Vec<Regex>,
    skip_branches: Vec<Regex>,
}

/// Branch filters shared by presubmits and postsubmits.
///
/// Entries are regular expressions matched against the whole branch name, so
/// a plain branch name matches only itself. Patterns are compiled once, by
/// [`Brancher::validate`] or on the first match, so change them before
/// either runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Brancher {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub branches: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skip_branches: Vec<String>,

    #[serde(skip)]
    compiled: RegexCache<CompiledBranches>,
}

impl Brancher {
    pub fn new(branches: Vec<String>, skip_branches: Vec<String>) -> Self {
        Self {
            branches,
            skip_branches,
            compiled: RegexCache::default(),
        }
    }

    /// Returns `true` when a job with these filters runs against `branch`.
    ///
    /// A skip match always wins. With no `branches` every other branch runs.
    pub fn should_run(&self, branch: &str) -> bool {
        let compiled = self.compiled();
        if compiled.skip_branches.iter().any(|re| re.is_match(branch)) {
            return false;
        }
        self.branches.is_empty() || compiled.branches.iter().any(|re| re.is_match(branch))
    }

    pub fn validate(&self) -> ConfigurationResult<()> {
        if !self.branches.is_empty() && !self.skip_branches.is_empty() {
            return Err(ConfigurationError::InvalidConfiguration {
                field: "branches".to_string(),
                reason: "branches and skip_branches are mutually exclusive".to_string(),
            });
        }
        let compiled = CompiledBranches {
            branches: anchored_all(&self.branches)?,
            skip_branches: anchored_all(&self.skip_branches)?,
        };
        self.compiled.store(compiled);
        Ok(())
    }

    fn compiled(&self) -> &CompiledBranches {
        // Patterns are validated on load; one that fails to compile matches nothing.
        self.compiled.0.get_or_init(|| CompiledBranches {
            branches: self.branches.iter().filter_map(|p| anchored(p).ok()).collect(),
            skip_branches: self.skip_branches.iter().filter_map(|p| anchored(p).ok()).collect(),
        })
    }
}

fn anchored(pattern: &str) -> ConfigurationResult<Regex> {
    Regex::new(&format!("^(?:{})$", pattern)).map_err(|e| {
        ConfigurationError::InvalidConfiguration {
            field: "branches".to_string(),
            reason: format!("invalid branch pattern '{}': {}", pattern, e),
        }
    })
}

fn anchored_all(patterns: &[String]) -> ConfigurationResult<Vec<Regex>> {
    patterns.iter().map(|p| anchored(p)).collect()
}

/// File filter of a presubmit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ChangeMatcher {
    /// Run only when a changed file matches this regular expression
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_if_changed: Option<String>,

    #[serde(skip)]
    compiled: RegexCache<Option<Regex>>,
}

impl ChangeMatcher {
    pub fn new(run_if_changed: impl Into<String>) -> Self {
        Self {
            run_if_changed: Some(run_if_changed.into()),
            compiled: RegexCache::default(),
        }
    }

    pub fn is_set(&self) -> bool {
        self.run_if_changed.is_some()
    }

    /// Returns `true` when any of `changed_files` matches the filter.
    ///
    /// An unset or invalid filter matches nothing.
    pub fn matches(&self, changed_files: &[String]) -> bool {
        let compiled = self.compiled.0.get_or_init(|| {
            self.run_if_changed
                .as_deref()
                .and_then(|pattern| Regex::new(pattern).ok())
        });
        compiled
            .as_ref()
            .is_some_and(|re| changed_files.iter().any(|file| re.is_match(file)))
    }

    fn validate(&self, job: &str) -> ConfigurationResult<()> {
        let compiled = self
            .run_if_changed
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(|e| ConfigurationError::InvalidConfiguration {
                field: format!("{}.run_if_changed", job),
                reason: e.to_string(),
            })?;
        self.compiled.store(compiled);
        Ok(())
    }
}

/// A job triggered by pull requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Presubmit {
    #[serde(flatten)]
    pub base: JobBase,

    #[serde(default)]
    pub always_run: bool,

    /// Failures do not block merging
    #[serde(default)]
    pub optional: bool,

    #[serde(flatten)]
    pub changes: ChangeMatcher,

    /// Status context reported to the code host; defaults to the job name
    #[serde(default)]
    pub context: String,

    #[serde(flatten)]
    pub brancher: Brancher,
}

impl Presubmit {
    /// Returns `true` when the job must run for a change to `branch` touching
    /// `changed_files`.
    pub fn should_run(&self, branch: &str, changed_files: &[String]) -> bool {
        if !self.brancher.should_run(branch) {
            return false;
        }
        self.always_run || self.changes.matches(changed_files)
    }

    pub fn apply_defaults(&mut self) {
        if self.context.is_empty() {
            self.context = self.base.name.clone();
        }
    }

    pub fn validate(&self) -> ConfigurationResult<()> {
        self.base.validate()?;
        self.brancher.validate()?;
        if self.always_run && self.changes.is_set() {
            return Err(ConfigurationError::InvalidConfiguration {
                field: format!("{}.run_if_changed", self.base.name),
                reason: "always_run and run_if_changed are mutually exclusive".to_string(),
            });
        }
        self.changes.validate(&self.base.name)
    }
}

/// A job triggered by pushes to a branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Postsubmit {
    #[serde(flatten)]
    pub base: JobBase,

    #[serde(flatten)]
    pub brancher: Brancher,
}

impl Postsubmit {
    pub fn should_run(&self, branch: &str) -> bool {
        self.brancher.should_run(branch)
    }

    pub fn validate(&self) -> ConfigurationResult<()> {
        self.base.validate()?;
        self.brancher.validate()
    }
}

/// A repository a periodic job checks out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraRef {
    pub org: String,
    pub repo: String,
    #[serde(default)]
    pub base_ref: String,
}

/// A job triggered on a schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Periodic {
    #[serde(flatten)]
    pub base: JobBase,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron: Option<String>,

    /// Interval between runs, such as `1h` or `30m`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_refs: Vec<ExtraRef>,
}

impl Periodic {
    /// Repository used when resolving defaults: the first extra ref, if any.
    pub fn repo(&self) -> String {
        self.extra_refs
            .first()
            .map(|r| format!("{}/{}", r.org, r.repo))
            .unwrap_or_default()
    }

    pub fn validate(&self) -> ConfigurationResult<()> {
        self.base.validate()?;
        let has_cron = self.cron.as_deref().is_some_and(|c| !c.is_empty());
        let has_interval = self.interval.as_deref().is_some_and(|i| !i.is_empty());
        if has_cron == has_interval {
            return Err(ConfigurationError::InvalidConfiguration {
                field: format!("{}.cron", self.base.name),
                reason: "exactly one of cron and interval must be set".to_string(),
            });
        }
        Ok(())
    }
}

/// Environment shared by every job carrying a given set of labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Preset {
    #[serde(default)]
    pub labels: BTreeMap<String, String>,

    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl Preset {
    /// Returns `true` when every preset label is on the job with the same value.
    pub fn applies_to(&self, job: &JobBase) -> bool {
        self.labels
            .iter()
            .all(|(key, value)| job.labels.get(key) == Some(value))
    }

    /// Merges the preset environment into `job` when the preset applies.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::InvalidConfiguration` when the job already
    /// sets one of the variables to a different value.
    pub fn apply(&self, job: &mut JobBase) -> ConfigurationResult<()> {
        if !self.applies_to(job) {
            return Ok(());
        }
        for (name, value) in &self.env {
            match job.env.get(name) {
                Some(existing) if existing != value => {
                    return Err(ConfigurationError::InvalidConfiguration {
                        field: format!("{}.env.{}", job.name, name),
                        reason: format!(
                            "preset sets '{}' but the job already sets '{}'",
                            value, existing
                        ),
                    });
                }
                Some(_) => {}
                None => {
                    job.env.insert(name.clone(), value.clone());
                }
            }
        }
        Ok(())
    }
}

/// Applies every preset in order.
pub fn apply_presets(presets: &[Preset], job: &mut JobBase) -> ConfigurationResult<()> {
    presets.iter().try_for_each(|preset| preset.apply(job))
}
