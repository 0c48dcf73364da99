//! Job configuration that lives inside the repository under test.

use crate::errors::{ConfigurationError, ConfigurationResult};
use crate::jobs::{Postsubmit, Presubmit, Preset};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "versioned_config_tests.rs"]
mod tests;

/// Jobs and presets defined at one exact repository state.
///
/// The same base and head SHAs always produce the same `VersionedConfig`,
/// which is what makes it safe to cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct VersionedConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub presets: Vec<Preset>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub presubmits: Vec<Presubmit>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub postsubmits: Vec<Postsubmit>,
}

impl VersionedConfig {
    /// Parses one in-repo configuration file.
    pub fn from_toml_str(content: &str) -> ConfigurationResult<Self> {
        toml::from_str(content).map_err(|e| ConfigurationError::ParseError {
            reason: e.to_string(),
        })
    }

    /// Combines several configuration files, keeping their order.
    pub fn merge_all(configs: impl IntoIterator<Item = VersionedConfig>) -> Self {
        configs
            .into_iter()
            .fold(Self::default(), |mut merged, config| {
                merged.presets.extend(config.presets);
                merged.presubmits.extend(config.presubmits);
                merged.postsubmits.extend(config.postsubmits);
                merged
            })
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty() && self.presubmits.is_empty() && self.postsubmits.is_empty()
    }
}

/// Produces the in-repo configuration for a repository state.
///
/// Implementations check out `base_sha`, merge `head_shas` on top in order and
/// read the configuration files. The result is defaulted and validated by the
/// caller before it is cached.
#[async_trait]
pub trait VersionedConfigLoader: Send + Sync {
    async fn load(
        &self,
        identifier: &str,
        base_sha: &str,
        head_shas: &[String],
    ) -> ConfigurationResult<VersionedConfig>;
}
