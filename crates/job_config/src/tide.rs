//! Merge-pool search queries.
//!
//! Configuration authors tend to repeat the same query once per organization
//! or repository. Deduplication folds queries that differ only in the
//! repositories they target into one, so the code host is asked fewer, wider
//! questions.

use crate::errors::{ConfigurationError, ConfigurationResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

#[cfg(test)]
#[path = "tide_tests.rs"]
mod tests;

/// A pull request search for the merge pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TideQuery {
    #[serde(default)]
    pub orgs: Vec<String>,

    #[serde(default)]
    pub repos: Vec<String>,

    #[serde(default)]
    pub excluded_repos: Vec<String>,

    #[serde(default)]
    pub author: String,

    /// Required labels; a comma separated entry accepts any of its labels
    #[serde(default)]
    pub labels: Vec<String>,

    #[serde(default)]
    pub missing_labels: Vec<String>,

    #[serde(default)]
    pub excluded_branches: Vec<String>,

    #[serde(default)]
    pub included_branches: Vec<String>,

    #[serde(default)]
    pub milestone: String,

    #[serde(default)]
    pub review_approved_required: bool,
}

impl TideQuery {
    /// Renders the query as a code-host search string.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use job_config::TideQuery;
    ///
    /// let query = TideQuery {
    ///     orgs: vec!["kubernetes".to_string()],
    ///     labels: vec!["lgtm".to_string()],
    ///     ..Default::default()
    /// };
    ///
    /// assert_eq!(
    ///     query.query(),
    ///     r#"is:pr state:open archived:false org:"kubernetes" label:"lgtm""#
    /// );
    /// ```
    pub fn query(&self) -> String {
        let mut tokens = vec![
            "is:pr".to_string(),
            "state:open".to_string(),
            "archived:false".to_string(),
        ];

        if !self.author.is_empty() {
            tokens.push(format!("author:\"{}\"", self.author));
        }
        tokens.extend(self.orgs.iter().map(|o| format!("org:\"{}\"", o)));
        tokens.extend(self.repos.iter().map(|r| format!("repo:\"{}\"", r)));
        tokens.extend(self.excluded_repos.iter().map(|r| format!("-repo:\"{}\"", r)));
        tokens.extend(self.excluded_branches.iter().map(|b| format!("-base:\"{}\"", b)));
        tokens.extend(self.included_branches.iter().map(|b| format!("base:\"{}\"", b)));
        for label in &self.labels {
            let alternatives: Vec<String> =
                label.split(',').map(|l| format!("\"{}\"", l)).collect();
            tokens.push(format!("label:{}", alternatives.join(",")));
        }
        tokens.extend(self.missing_labels.iter().map(|l| format!("-label:\"{}\"", l)));
        if !self.milestone.is_empty() {
            tokens.push(format!("milestone:\"{}\"", self.milestone));
        }
        if self.review_approved_required {
            tokens.push("review:approved".to_string());
        }

        tokens.join(" ")
    }

    /// Returns `true` when the query covers `org/repo`.
    pub fn for_repo(&self, org: &str, repo: &str) -> bool {
        let full_name = format!("{}/{}", org, repo);
        if self.excluded_repos.contains(&full_name) {
            return false;
        }
        self.orgs.iter().any(|o| o == org) || self.repos.contains(&full_name)
    }

    /// Sorts the criteria lists, which are matched as sets.
    fn sort_criteria(&mut self) {
        self.labels.sort();
        self.missing_labels.sort();
        self.excluded_branches.sort();
        self.included_branches.sort();
    }

    /// Canonical form of everything except the target sets.
    fn signature(&self) -> ConfigurationResult<String> {
        let mut signature = Self {
            orgs: Vec::new(),
            repos: Vec::new(),
            excluded_repos: Vec::new(),
            ..self.clone()
        };
        signature.sort_criteria();

        to_canonical(&signature)
    }
}

fn to_canonical(query: &TideQuery) -> ConfigurationResult<String> {
    serde_json::to_string(query).map_err(|e| ConfigurationError::InvalidConfiguration {
        field: "tide.queries".to_string(),
        reason: e.to_string(),
    })
}

/// Folds queries that differ only in `orgs`, `repos` and `excluded_repos`.
///
/// Target lists of a group are merged, sorted and deduplicated; the first
/// query of each group supplies the other fields with its criteria lists
/// sorted. The result is sorted by canonical serialisation, so equivalent
/// inputs produce the same output whatever their order.
pub fn dedup_queries(queries: &[TideQuery]) -> ConfigurationResult<Vec<TideQuery>> {
    let mut groups: BTreeMap<String, TideQuery> = BTreeMap::new();

    for query in queries {
        let signature = query.signature()?;
        match groups.get_mut(&signature) {
            Some(group) => {
                group.orgs.extend(query.orgs.iter().cloned());
                group.repos.extend(query.repos.iter().cloned());
                group.excluded_repos.extend(query.excluded_repos.iter().cloned());
            }
            None => {
                let mut group = query.clone();
                group.sort_criteria();
                groups.insert(signature, group);
            }
        }
    }

    let mut deduped = groups
        .into_values()
        .map(|mut query| {
            for targets in [&mut query.orgs, &mut query.repos, &mut query.excluded_repos] {
                targets.sort();
                targets.dedup();
            }
            to_canonical(&query).map(|canonical| (canonical, query))
        })
        .collect::<ConfigurationResult<Vec<_>>>()?;
    deduped.sort_by(|(a, _), (b, _)| a.cmp(b));

    debug!(
        before = queries.len(),
        after = deduped.len(),
        "Deduplicated tide queries"
    );
    Ok(deduped.into_iter().map(|(_, query)| query).collect())
}
