//! In-repository configuration enablement and cluster allow-listing.
//!
//! Both settings are keyed by `org/repo`, `org` or `*`. Identifiers for
//! repositories on other code hosts are URLs such as
//! `https://host.example/org/repo`; those are looked up both with and without
//! their scheme.

use crate::merger::WILDCARD;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[cfg(test)]
#[path = "in_repo_tests.rs"]
mod tests;

/// Cluster in-repo jobs may use when nothing else is allowed.
pub const DEFAULT_CLUSTER: &str = "default";

/// Settings controlling where in-repo configuration is honoured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct InRepoConfig {
    /// Enablement per `org/repo`, `org` or `*`
    #[serde(default)]
    pub enabled: BTreeMap<String, bool>,

    /// Clusters in-repo jobs may target, per `org/repo`, `org` or `*`
    #[serde(default)]
    pub allowed_clusters: BTreeMap<String, Vec<String>>,
}

impl InRepoConfig {
    /// Returns `true` when in-repo configuration is enabled for `identifier`.
    ///
    /// The most specific configured key wins, so `{"org/repo": false,
    /// "org": true}` disables `org/repo` while enabling the rest of `org`.
    /// Nothing configured means disabled.
    pub fn enabled(&self, identifier: &str) -> bool {
        candidate_keys(identifier)
            .iter()
            .find_map(|key| self.enabled.get(key).copied())
            .unwrap_or(false)
    }

    /// Clusters allowed for `identifier`, gathered across all matching keys.
    ///
    /// Allow-lists are additive: a cluster allowed for the org is also allowed
    /// for each of its repositories.
    pub fn allowed_clusters_for(&self, identifier: &str) -> Vec<String> {
        let mut clusters: Vec<String> = Vec::new();
        for key in candidate_keys(identifier) {
            for cluster in self.allowed_clusters.get(&key).into_iter().flatten() {
                if !clusters.contains(cluster) {
                    clusters.push(cluster.clone());
                }
            }
        }
        clusters
    }

    /// Returns `true` when in-repo jobs of `identifier` may run on `cluster`.
    pub fn allows_cluster(&self, identifier: &str, cluster: &str) -> bool {
        self.allowed_clusters_for(identifier)
            .iter()
            .any(|allowed| allowed == cluster)
    }

    /// Allows the default cluster everywhere when no allow-list is configured.
    pub fn apply_defaults(&mut self) {
        if self.allowed_clusters.is_empty() {
            self.allowed_clusters
                .insert(WILDCARD.to_string(), vec![DEFAULT_CLUSTER.to_string()]);
        }
    }
}

/// Lookup keys for `identifier`, narrowest first.
///
/// The list is the identifier, the identifier without its scheme, its
/// organization with and without the scheme, and finally `*`. Duplicates are
/// dropped, so a plain `org/repo` yields `["org/repo", "org", "*"]`.
pub fn candidate_keys(identifier: &str) -> Vec<String> {
    let (scheme, rest) = match identifier.split_once("://") {
        Some((scheme, rest)) => (Some(scheme), rest),
        None => (None, identifier),
    };

    let mut keys = vec![identifier.to_string(), rest.to_string()];
    if let Some((org, _)) = rest.rsplit_once('/') {
        if let Some(scheme) = scheme {
            keys.push(format!("{}://{}", scheme, org));
        }
        keys.push(org.to_string());
    }
    keys.push(WILDCARD.to_string());

    let mut unique: Vec<String> = Vec::with_capacity(keys.len());
    for key in keys {
        if !key.is_empty() && !unique.contains(&key) {
            unique.push(key);
        }
    }
    unique
}

/// Returns `identifier` without a leading `scheme://`.
pub fn strip_scheme(identifier: &str) -> &str {
    identifier
        .split_once("://")
        .map_or(identifier, |(_, rest)| rest)
}
