//! Who may rerun a job.

use crate::merger::Overlay;
use serde::{Deserialize, Serialize};

/// A GitHub team identified by organization and slug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitHubTeamSlug {
    pub org: String,
    pub slug: String,
}

/// Rerun authorization policy.
///
/// Unlike the other payloads this one is never merged field by field: an
/// allow-list assembled from two layers would grant access neither layer
/// intended. A more specific layer therefore replaces the whole policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RerunAuthConfig {
    /// Anyone may rerun
    #[serde(default)]
    pub allow_anyone: bool,

    /// GitHub logins allowed to rerun
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub github_users: Vec<String>,

    /// Numeric GitHub team IDs allowed to rerun
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub github_team_ids: Vec<u64>,

    /// GitHub teams allowed to rerun
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub github_team_slugs: Vec<GitHubTeamSlug>,

    /// Members of these GitHub organizations may rerun
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub github_orgs: Vec<String>,
}

impl RerunAuthConfig {
    /// Returns `true` when the policy grants nothing to anyone.
    pub fn is_empty(&self) -> bool {
        !self.allow_anyone
            && self.github_users.is_empty()
            && self.github_team_ids.is_empty()
            && self.github_team_slugs.is_empty()
            && self.github_orgs.is_empty()
    }

    /// Checks whether `login` is allowed by the user list or `allow_anyone`.
    ///
    /// Logins are compared case-insensitively. Team and organization
    /// membership need a code-host lookup and are not checked here.
    pub fn allows_user(&self, login: &str) -> bool {
        self.allow_anyone
            || self
                .github_users
                .iter()
                .any(|user| user.eq_ignore_ascii_case(login))
    }
}

impl Overlay for RerunAuthConfig {
    fn overlay(&mut self, other: &Self) {
        if !other.is_empty() {
            self.clone_from(other);
        }
    }
}

#[cfg(test)]
#[path = "rerun_auth_tests.rs"]
mod tests;
