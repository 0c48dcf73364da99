//! Configuration payloads resolved through precedence entries.
//!
//! Each type implements [`Overlay`](crate::merger::Overlay), which defines how
//! a later, more specific layer is applied to an earlier one.

pub mod decoration;
pub mod job_defaults;
pub mod rerun_auth;

// Re-export all types for convenient access
pub use decoration::{DecorationConfig, GcsConfiguration, PathStrategy, UtilityImages};
pub use job_defaults::{JobDefaults, DEFAULT_TENANT_ID};
pub use rerun_auth::{GitHubTeamSlug, RerunAuthConfig};
