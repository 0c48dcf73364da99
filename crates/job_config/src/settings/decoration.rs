//! Pod decoration settings.
//!
//! Decoration injects the utility containers (clone, upload, entrypoint,
//! sidecar) into a job and tells them where to put artifacts.

use crate::errors::{ConfigurationError, ConfigurationResult};
use crate::merger::{overlay_nested, overlay_value, Overlay};
use serde::{Deserialize, Serialize};

/// Decoration configuration for a job.
///
/// Every field is optional so entries can set only what they care about.
/// Nested `utility_images` and `gcs_configuration` are overlaid field by
/// field as well.
///
/// # Examples
///
/// ```rust
/// use job_config::{DecorationConfig, Overlay};
///
/// let mut base = DecorationConfig {
///     timeout_secs: Some(7200),
///     skip_cloning: Some(false),
///     ..Default::default()
/// };
/// let specific = DecorationConfig {
///     skip_cloning: Some(true),
///     ..Default::default()
/// };
///
/// base.overlay(&specific);
/// assert_eq!(base.timeout_secs, Some(7200));
/// assert_eq!(base.skip_cloning, Some(true));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DecorationConfig {
    /// Maximum run time before the job is aborted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Time between the abort signal and a forced kill
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grace_period_secs: Option<u64>,

    /// Images for the injected utility containers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utility_images: Option<UtilityImages>,

    /// Where job artifacts are uploaded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gcs_configuration: Option<GcsConfiguration>,

    /// Secret holding the upload credentials
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gcs_credentials_secret: Option<String>,

    /// Service account used when the job does not name one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_service_account_name: Option<String>,

    /// Secrets mounted for cloning over SSH
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssh_key_secrets: Option<Vec<String>>,

    /// Skip cloning the repository under test
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_cloning: Option<bool>,

    /// Redact secret values from uploaded logs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub censor_secrets: Option<bool>,

    /// Keep uploading artifacts when the job is interrupted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_ignores_interrupts: Option<bool>,
}

impl Overlay for DecorationConfig {
    fn overlay(&mut self, other: &Self) {
        overlay_value(&mut self.timeout_secs, &other.timeout_secs);
        overlay_value(&mut self.grace_period_secs, &other.grace_period_secs);
        overlay_nested(&mut self.utility_images, &other.utility_images);
        overlay_nested(&mut self.gcs_configuration, &other.gcs_configuration);
        overlay_value(&mut self.gcs_credentials_secret, &other.gcs_credentials_secret);
        overlay_value(
            &mut self.default_service_account_name,
            &other.default_service_account_name,
        );
        overlay_value(&mut self.ssh_key_secrets, &other.ssh_key_secrets);
        overlay_value(&mut self.skip_cloning, &other.skip_cloning);
        overlay_value(&mut self.censor_secrets, &other.censor_secrets);
        overlay_value(
            &mut self.upload_ignores_interrupts,
            &other.upload_ignores_interrupts,
        );
    }
}

impl DecorationConfig {
    /// Checks that a resolved configuration can actually decorate a job.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::InvalidConfiguration` when a utility image
    /// is missing or a timeout is zero.
    pub fn validate(&self) -> ConfigurationResult<()> {
        let images = self.utility_images.as_ref().ok_or_else(|| {
            ConfigurationError::InvalidConfiguration {
                field: "decoration_config.utility_images".to_string(),
                reason: "utility images must be configured for decorated jobs".to_string(),
            }
        })?;
        images.validate()?;

        if self.timeout_secs == Some(0) {
            return Err(ConfigurationError::InvalidConfiguration {
                field: "decoration_config.timeout_secs".to_string(),
                reason: "timeout must be greater than zero".to_string(),
            });
        }
        if self.grace_period_secs == Some(0) {
            return Err(ConfigurationError::InvalidConfiguration {
                field: "decoration_config.grace_period_secs".to_string(),
                reason: "grace period must be greater than zero".to_string(),
            });
        }

        Ok(())
    }
}

/// Images for the containers injected by decoration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct UtilityImages {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clonerefs: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub initupload: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sidecar: Option<String>,
}

impl Overlay for UtilityImages {
    fn overlay(&mut self, other: &Self) {
        overlay_value(&mut self.clonerefs, &other.clonerefs);
        overlay_value(&mut self.initupload, &other.initupload);
        overlay_value(&mut self.entrypoint, &other.entrypoint);
        overlay_value(&mut self.sidecar, &other.sidecar);
    }
}

impl UtilityImages {
    fn validate(&self) -> ConfigurationResult<()> {
        let images = [
            ("clonerefs", &self.clonerefs),
            ("initupload", &self.initupload),
            ("entrypoint", &self.entrypoint),
            ("sidecar", &self.sidecar),
        ];

        for (name, image) in images {
            if image.as_deref().map_or(true, str::is_empty) {
                return Err(ConfigurationError::InvalidConfiguration {
                    field: format!("decoration_config.utility_images.{}", name),
                    reason: "image must be set".to_string(),
                });
            }
        }

        Ok(())
    }
}

/// How artifact paths are laid out in the bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathStrategy {
    /// Always include org and repo in the path
    Explicit,
    /// Omit the default org, keep the repo
    Legacy,
    /// Omit both the default org and default repo
    Single,
}

/// Artifact upload location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GcsConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_strategy: Option<PathStrategy>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_org: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_repo: Option<String>,
}

impl Overlay for GcsConfiguration {
    fn overlay(&mut self, other: &Self) {
        overlay_value(&mut self.bucket, &other.bucket);
        overlay_value(&mut self.path_strategy, &other.path_strategy);
        overlay_value(&mut self.default_org, &other.default_org);
        overlay_value(&mut self.default_repo, &other.default_repo);
    }
}

#[cfg(test)]
#[path = "decoration_tests.rs"]
mod tests;
