//! Cache keys for "repository at this exact commit set" computations.
//!
//! A [`CacheKeyParts`] names the identifier, base SHA and ordered head SHAs a
//! versioned configuration was built from. SHAs are obtained through
//! [`RefGetter`]s, which are lazy: nothing is fetched until
//! [`make_cache_key_parts`] is called, and that only happens once the caller
//! knows the result is needed.
//!
//! # Examples
//!
//! ```
//! use job_config::{make_cache_key_parts, ConfigurationError};
//!
//! # async fn example() -> Result<(), ConfigurationError> {
//! let base = || async { Ok::<_, ConfigurationError>("base-sha".to_string()) };
//! let head = || async { Ok::<_, ConfigurationError>("head-sha".to_string()) };
//!
//! let parts = make_cache_key_parts("org/repo", &base, &[&head]).await?;
//! assert_eq!(parts.head_shas, vec!["head-sha".to_string()]);
//!
//! let key = parts.cache_key()?;
//! assert!(key.as_str().contains("org/repo"));
//! # Ok(())
//! # }
//! ```

use crate::errors::{ConfigurationError, ConfigurationResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use tokio::sync::OnceCell;

#[cfg(test)]
#[path = "cache_key_tests.rs"]
mod tests;

/// Lazily resolves a git reference to a SHA.
///
/// Implementations typically call a code-host API, so they are only invoked
/// when the SHA is actually needed. Any `Fn() -> impl Future` closure returning
/// `ConfigurationResult<String>` through an owned future is a `RefGetter`.
///
/// Returning an empty string means "no reference" and is not an error.
#[async_trait]
pub trait RefGetter: Send + Sync {
    /// Resolves the reference to a SHA.
    async fn get(&self) -> ConfigurationResult<String>;
}

#[async_trait]
impl<F, Fut> RefGetter for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = ConfigurationResult<String>> + Send + 'static,
{
    async fn get(&self) -> ConfigurationResult<String> {
        (self)().await
    }
}

/// A [`RefGetter`] that remembers its first successful answer.
///
/// Useful when the same pull request reference is handed to several
/// resolution calls: the underlying getter runs once, later calls reuse the
/// SHA. Failures are not remembered, so a later call tries again.
pub struct OnceRefGetter<G> {
    inner: G,
    sha: OnceCell<String>,
}

impl<G: RefGetter> OnceRefGetter<G> {
    pub fn new(inner: G) -> Self {
        Self {
            inner,
            sha: OnceCell::new(),
        }
    }
}

impl<G> fmt::Debug for OnceRefGetter<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnceRefGetter")
            .field("sha", &self.sha.get())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<G: RefGetter> RefGetter for OnceRefGetter<G> {
    async fn get(&self) -> ConfigurationResult<String> {
        self.sha.get_or_try_init(|| self.inner.get()).await.cloned()
    }
}

/// The versioned state a configuration was resolved for.
///
/// `head_shas` keeps the order the caller supplied: the same SHAs in a
/// different order are a different key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheKeyParts {
    /// Repository identifier (`org/repo`, or a URL for non-default hosts)
    pub identifier: String,

    /// SHA of the base branch
    pub base_sha: String,

    /// SHAs of the heads merged on top of the base, in caller order
    pub head_shas: Vec<String>,
}

impl CacheKeyParts {
    /// Creates key parts from already resolved SHAs.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::EmptyIdentifier` when `identifier` is empty.
    pub fn new(
        identifier: impl Into<String>,
        base_sha: impl Into<String>,
        head_shas: Vec<String>,
    ) -> ConfigurationResult<Self> {
        let identifier = identifier.into();
        if identifier.is_empty() {
            return Err(ConfigurationError::EmptyIdentifier);
        }

        Ok(Self {
            identifier,
            base_sha: base_sha.into(),
            head_shas,
        })
    }

    /// Serialises the parts into their canonical cache key.
    pub fn cache_key(&self) -> ConfigurationResult<CacheKey> {
        serde_json::to_string(self)
            .map(CacheKey)
            .map_err(|e| ConfigurationError::InvalidConfiguration {
                field: "cache_key".to_string(),
                reason: e.to_string(),
            })
    }
}

/// Canonical, comparable form of [`CacheKeyParts`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolves the getters and assembles [`CacheKeyParts`].
///
/// The identifier is checked before any getter runs. The base getter runs
/// first, then each head getter in order; the first failure is returned and no
/// further getters are invoked. Heads that resolve to an empty string are left
/// out.
///
/// # Errors
///
/// - `ConfigurationError::EmptyIdentifier` when `identifier` is empty
/// - `ConfigurationError::RefLookupFailed` wrapping the first getter failure
pub async fn make_cache_key_parts(
    identifier: &str,
    base: &dyn RefGetter,
    heads: &[&dyn RefGetter],
) -> ConfigurationResult<CacheKeyParts> {
    if identifier.is_empty() {
        return Err(ConfigurationError::EmptyIdentifier);
    }

    let base_sha = base
        .get()
        .await
        .map_err(|e| ConfigurationError::RefLookupFailed {
            reference: "base".to_string(),
            source: Box::new(e),
        })?;

    let mut head_shas = Vec::with_capacity(heads.len());
    for (index, head) in heads.iter().enumerate() {
        let sha = head
            .get()
            .await
            .map_err(|e| ConfigurationError::RefLookupFailed {
                reference: format!("head {}", index),
                source: Box::new(e),
            })?;
        if !sha.is_empty() {
            head_shas.push(sha);
        }
    }

    Ok(CacheKeyParts {
        identifier: identifier.to_string(),
        base_sha,
        head_shas,
    })
}
