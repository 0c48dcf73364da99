//! Cached access to in-repo configuration.
//!
//! Producing a [`VersionedConfig`] means cloning a repository, merging pull
//! request heads and parsing files, so results are cached by the exact
//! `(identifier, base SHA, head SHAs)` they were built from. Many tasks ask for
//! the same state at once when a pull request is updated; the underlying
//! [`BoundedCache`] makes sure only one of them does the work.
//!
//! The cache stores type-erased values so one cache instance can be shared
//! with other computations keyed the same way. Reading a value of another type
//! is reported as `ConfigurationError::WrongCacheValueType`.

use crate::cache_key::{make_cache_key_parts, CacheKey, CacheKeyParts, RefGetter};
use crate::config::Config;
use crate::errors::{ConfigurationError, ConfigurationResult};
use crate::versioned_config::{VersionedConfig, VersionedConfigLoader};
use config_cache::{get_or_add, BoundedCache, CacheStatistics};
use std::any::Any;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, instrument, warn};

#[cfg(test)]
#[path = "versioned_config_cache_tests.rs"]
mod tests;

/// Type-erased cached value.
pub type CacheValue = Arc<dyn Any + Send + Sync>;

/// Cache instance that can be shared between [`VersionedConfigCache`]s.
pub type SharedCache = BoundedCache<CacheKey, CacheValue, ConfigurationError>;

/// Resolves in-repo configuration through an optional bounded cache.
#[derive(Clone)]
pub struct VersionedConfigCache {
    config: Arc<Config>,
    cache: Option<Arc<SharedCache>>,
}

impl VersionedConfigCache {
    /// Creates a wrapper with its own cache holding up to `capacity` entries.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::Cache` when `capacity` is zero.
    pub fn new(config: Arc<Config>, capacity: usize) -> ConfigurationResult<Self> {
        let cache = SharedCache::new(capacity)?;
        Ok(Self {
            config,
            cache: Some(Arc::new(cache)),
        })
    }

    /// Creates a wrapper that loads on every call.
    pub fn uncached(config: Arc<Config>) -> Self {
        Self {
            config,
            cache: None,
        }
    }

    /// Creates a wrapper storing its results in `cache`.
    pub fn with_shared_cache(config: Arc<Config>, cache: Arc<SharedCache>) -> Self {
        Self {
            config,
            cache: Some(cache),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Number of cached entries; always zero without a cache.
    pub fn len(&self) -> usize {
        self.cache.as_ref().map_or(0, |cache| cache.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every cached entry.
    pub fn purge(&self) {
        if let Some(cache) = &self.cache {
            cache.purge();
        }
    }

    pub fn statistics(&self) -> Option<CacheStatistics> {
        self.cache.as_ref().map(|cache| cache.statistics())
    }

    /// Returns the defaulted and validated in-repo configuration for
    /// `identifier` at `base` with `heads` merged on top.
    ///
    /// When in-repo configuration is disabled for `identifier` an empty
    /// configuration is returned without calling any getter, touching the
    /// cache or invoking `loader`. Otherwise the getters are resolved into a
    /// cache key and `loader` runs only if no cached value exists for it.
    ///
    /// # Errors
    ///
    /// - `ConfigurationError::EmptyIdentifier` for an empty identifier
    /// - `ConfigurationError::RefLookupFailed` when a getter fails
    /// - whatever `loader` or defaulting returns; such failures are not cached
    /// - `ConfigurationError::WrongCacheValueType` when a shared cache holds
    ///   something else under the same key
    #[instrument(skip(self, loader, base, heads), fields(head_count = heads.len()))]
    pub async fn get_versioned_config(
        &self,
        loader: &dyn VersionedConfigLoader,
        identifier: &str,
        base: &dyn RefGetter,
        heads: &[&dyn RefGetter],
    ) -> ConfigurationResult<Arc<VersionedConfig>> {
        if !self.config.in_repo_config.enabled(identifier) {
            debug!("In-repo configuration is disabled");
            return Ok(Arc::new(VersionedConfig::default()));
        }

        let resolved_parts: OnceLock<CacheKeyParts> = OnceLock::new();
        let parts_slot = &resolved_parts;

        let key_constructor = move || async move {
            let parts = make_cache_key_parts(identifier, base, heads).await?;
            let key = parts.cache_key()?;
            let _ = parts_slot.set(parts);
            Ok::<_, ConfigurationError>(key)
        };

        let value_constructor = move || async move {
            let parts = match parts_slot.get() {
                Some(parts) => parts.clone(),
                None => make_cache_key_parts(identifier, base, heads).await?,
            };
            let versioned = self.load_and_default(loader, &parts).await?;
            Ok::<_, ConfigurationError>(Arc::new(versioned) as CacheValue)
        };

        let value =
            get_or_add(self.cache.as_deref(), key_constructor, value_constructor).await?;

        value.downcast::<VersionedConfig>().map_err(|_| {
            let key = resolved_parts
                .get()
                .and_then(|parts| parts.cache_key().ok())
                .map_or_else(|| identifier.to_string(), |key| key.to_string());
            warn!(key = %key, "Cached value is not a versioned configuration");
            ConfigurationError::WrongCacheValueType {
                key,
                expected: "VersionedConfig".to_string(),
            }
        })
    }

    async fn load_and_default(
        &self,
        loader: &dyn VersionedConfigLoader,
        parts: &CacheKeyParts,
    ) -> ConfigurationResult<VersionedConfig> {
        info!(
            identifier = %parts.identifier,
            base_sha = %parts.base_sha,
            heads = parts.head_shas.len(),
            "Loading versioned configuration"
        );

        let mut versioned = loader
            .load(&parts.identifier, &parts.base_sha, &parts.head_shas)
            .await
            .inspect_err(|e| {
                warn!(
                    identifier = %parts.identifier,
                    error = %e,
                    "Failed to load versioned configuration"
                )
            })?;

        self.config
            .default_and_validate_versioned(&parts.identifier, &mut versioned)?;
        Ok(versioned)
    }
}

impl fmt::Debug for VersionedConfigCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionedConfigCache")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}
