//! Precedence-based default resolution.
//!
//! Defaults are registered as an ordered list of [`DefaultEntry`] values, each
//! carrying a repository filter, a cluster filter and a partial configuration.
//! Resolving defaults for a `(repo, cluster)` pair overlays every matching
//! entry in order, then overlays the job's own configuration:
//!
//! ```text
//! T::default()
//!     ← entry[0]   (if it matches)
//!     ← entry[1]   (if it matches)
//!     ← ...
//!     ← job's own configuration
//! ```
//!
//! Later layers win field by field. What "field by field" means is decided by
//! each payload type through its [`Overlay`] implementation.
//!
//! # Examples
//!
//! ```rust
//! use job_config::{resolve, DefaultEntry, JobDefaults};
//!
//! let entries = vec![
//!     DefaultEntry::new("*", "", JobDefaults::with_tenant("global")),
//!     DefaultEntry::new("kubernetes", "", JobDefaults::with_tenant("k8s")),
//! ];
//!
//! let resolved = resolve(&entries, "kubernetes/test-infra", "default", None);
//! assert_eq!(resolved.tenant_id.as_deref(), Some("k8s"));
//!
//! let resolved = resolve(&entries, "other/repo", "default", None);
//! assert_eq!(resolved.tenant_id.as_deref(), Some("global"));
//! ```

use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "merger_tests.rs"]
mod tests;

/// Filter value matching every repository or cluster.
pub const WILDCARD: &str = "*";

/// A configuration type that can be layered over another instance of itself.
///
/// `overlay` applies `other` on top of `self`: anything `other` sets wins,
/// anything it leaves unset keeps the value already in `self`.
pub trait Overlay: Clone + Default {
    fn overlay(&mut self, other: &Self);
}

/// Overlays a nested optional configuration.
///
/// When both sides are set the nested values are overlaid rather than replaced.
pub fn overlay_nested<T: Overlay>(base: &mut Option<T>, other: &Option<T>) {
    if let Some(other) = other {
        base.get_or_insert_with(T::default).overlay(other);
    }
}

/// Replaces `base` when `other` is set.
pub fn overlay_value<T: Clone>(base: &mut Option<T>, other: &Option<T>) {
    if other.is_some() {
        base.clone_from(other);
    }
}

/// A partial configuration applied to repositories and clusters matching its
/// filters.
///
/// An empty or `*` filter matches anything. A repository filter otherwise
/// matches either the full `org/repo` string or just its organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultEntry<T> {
    /// `org`, `org/repo`, `*` or empty
    #[serde(default, rename = "repo")]
    pub org_repo: String,

    /// Cluster name, `*` or empty
    #[serde(default)]
    pub cluster: String,

    /// Configuration applied when both filters match
    pub config: T,
}

impl<T> DefaultEntry<T> {
    pub fn new(org_repo: impl Into<String>, cluster: impl Into<String>, config: T) -> Self {
        Self {
            org_repo: org_repo.into(),
            cluster: cluster.into(),
            config,
        }
    }

    /// Returns `true` when this entry applies to `repo` on `cluster`.
    pub fn matches(&self, repo: &str, cluster: &str) -> bool {
        let repo_matches = is_wildcard(&self.org_repo)
            || self.org_repo == repo
            || repo.split('/').next() == Some(self.org_repo.as_str());
        let cluster_matches = is_wildcard(&self.cluster) || self.cluster == cluster;

        repo_matches && cluster_matches
    }
}

fn is_wildcard(filter: &str) -> bool {
    filter.is_empty() || filter == WILDCARD
}

/// Resolves the effective configuration for `repo` on `cluster`.
///
/// Matching entries are overlaid in order starting from `T::default()`, then
/// `own` is overlaid last so the job always has the final say. Inputs are not
/// modified.
pub fn resolve<T: Overlay>(
    entries: &[DefaultEntry<T>],
    repo: &str,
    cluster: &str,
    own: Option<&T>,
) -> T {
    let mut resolved = T::default();

    for entry in entries.iter().filter(|entry| entry.matches(repo, cluster)) {
        resolved.overlay(&entry.config);
    }

    if let Some(own) = own {
        resolved.overlay(own);
    }

    resolved
}
