//! The jobs that apply to a repository state.

use crate::cache_key::RefGetter;
use crate::config::Config;
use crate::errors::ConfigurationResult;
use crate::jobs::{Postsubmit, Presubmit};
use crate::versioned_config::VersionedConfigLoader;
use crate::versioned_config_cache::VersionedConfigCache;
use tracing::{debug, instrument};

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;

/// Combines static jobs with in-repo jobs for a repository state.
///
/// Static jobs come first, followed by in-repo jobs in file order.
#[derive(Debug)]
pub struct JobResolver<L> {
    cache: VersionedConfigCache,
    loader: L,
}

impl<L: VersionedConfigLoader> JobResolver<L> {
    pub fn new(cache: VersionedConfigCache, loader: L) -> Self {
        Self { cache, loader }
    }

    pub fn config(&self) -> &Config {
        self.cache.config()
    }

    pub fn cache(&self) -> &VersionedConfigCache {
        &self.cache
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// Presubmits for a pull request with `heads` merged onto `base`.
    #[instrument(skip(self, base, heads))]
    pub async fn presubmits(
        &self,
        identifier: &str,
        base: &dyn RefGetter,
        heads: &[&dyn RefGetter],
    ) -> ConfigurationResult<Vec<Presubmit>> {
        let mut presubmits = self.config().static_presubmits(identifier).to_vec();

        let versioned = self
            .cache
            .get_versioned_config(&self.loader, identifier, base, heads)
            .await?;
        presubmits.extend(versioned.presubmits.iter().cloned());

        debug!(count = presubmits.len(), "Resolved presubmits");
        Ok(presubmits)
    }

    /// Postsubmits for a push that moved the branch to `base`.
    #[instrument(skip(self, base))]
    pub async fn postsubmits(
        &self,
        identifier: &str,
        base: &dyn RefGetter,
    ) -> ConfigurationResult<Vec<Postsubmit>> {
        let mut postsubmits = self.config().static_postsubmits(identifier).to_vec();

        let versioned = self
            .cache
            .get_versioned_config(&self.loader, identifier, base, &[])
            .await?;
        postsubmits.extend(versioned.postsubmits.iter().cloned());

        debug!(count = postsubmits.len(), "Resolved postsubmits");
        Ok(postsubmits)
    }
}
