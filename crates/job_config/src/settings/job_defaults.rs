//! Per-job execution defaults.

use crate::merger::{overlay_value, Overlay};
use serde::{Deserialize, Serialize};

/// Tenant assigned to jobs whose defaults never name one.
pub const DEFAULT_TENANT_ID: &str = "GlobalDefaultID";

/// Execution defaults applied to every job, decorated or not.
///
/// Overlay is field by field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct JobDefaults {
    /// Tenant the job's resources are accounted to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,

    /// Project results are published to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resultstore_project: Option<String>,
}

impl JobDefaults {
    /// Creates defaults that only set the tenant.
    pub fn with_tenant(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: Some(tenant_id.into()),
            ..Default::default()
        }
    }

    /// Fills in [`DEFAULT_TENANT_ID`] when no layer set a tenant.
    pub fn with_default_tenant(mut self) -> Self {
        if self.tenant_id.as_deref().map_or(true, str::is_empty) {
            self.tenant_id = Some(DEFAULT_TENANT_ID.to_string());
        }
        self
    }
}

impl Overlay for JobDefaults {
    fn overlay(&mut self, other: &Self) {
        overlay_value(&mut self.tenant_id, &other.tenant_id);
        overlay_value(&mut self.resultstore_project, &other.resultstore_project);
    }
}

#[cfg(test)]
#[path = "job_defaults_tests.rs"]
mod tests;
