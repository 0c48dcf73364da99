//! Tests for the static cluster configuration.

use super::*;
use std::io::Write;
use tempfile::NamedTempFile;

// ============================================================================
// Test Helpers
// ============================================================================

fn presubmit(name: &str, cluster: &str) -> Presubmit {
    Presubmit {
        base: JobBase {
            name: name.to_string(),
            cluster: cluster.to_string(),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn enabled_config() -> Config {
    Config::from_toml_str(
        r#"
        [in_repo_config.enabled]
        "org" = true

        [in_repo_config.allowed_clusters]
        "org" = ["default", "build"]

        [[jobs.presubmits."org/repo"]]
        name = "static-unit"
        "#,
    )
    .expect("Failed to parse config")
}

// ============================================================================
// Loading Tests
// ============================================================================

/// Verify a configuration file is loaded and finalized.
#[test]
fn test_load_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "decorate_all_jobs = true\n\n[[tide.queries]]\norgs = [\"org\"]").unwrap();

    let config = Config::load(file.path()).expect("Failed to load config");

    assert!(config.decorate_all_jobs);
    assert_eq!(config.tide.queries.len(), 1);
    assert!(config.in_repo_config.allows_cluster("any/repo", "default"));
}

/// Verify a missing file is reported as such.
#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = Config::load(&dir.path().join("missing.toml"));
    assert!(matches!(result, Err(ConfigurationError::FileNotFound { .. })));
}

/// Verify malformed TOML is a parse error.
#[test]
fn test_parse_error() {
    let result = Config::from_toml_str("decorate_all_jobs = ");
    assert!(matches!(result, Err(ConfigurationError::ParseError { .. })));
}

/// Verify an empty document yields a usable default configuration.
#[test]
fn test_empty_document() {
    let config = Config::from_toml_str("").unwrap();
    assert!(!config.in_repo_config.enabled("org/repo"));
    assert_eq!(
        config.job_defaults_for("org/repo", "default", None).tenant_id.as_deref(),
        Some(crate::settings::DEFAULT_TENANT_ID)
    );
}

// ============================================================================
// Finalize Tests
// ============================================================================

/// Verify legacy decoration maps are migrated.
#[test]
fn test_finalize_migrates_legacy_decoration() {
    let config = Config::from_toml_str(
        r#"
        [plank.default_decoration_configs."*"]
        timeout_secs = 100

        [plank.default_decoration_configs."org/repo"]
        timeout_secs = 300
        "#,
    )
    .unwrap();

    assert!(config.plank.default_decoration_configs.is_empty());
    assert_eq!(config.plank.default_decoration_config_entries.len(), 2);
    assert_eq!(
        config.decoration_for("org/repo", "default", None).timeout_secs,
        Some(300)
    );
    assert_eq!(
        config.decoration_for("org/other", "default", None).timeout_secs,
        Some(100)
    );
}

/// Verify legacy and entry forms of the same surface are rejected together.
#[test]
fn test_finalize_rejects_legacy_and_entries() {
    let result = Config::from_toml_str(
        r#"
        [deck.rerun_auth_configs."*"]
        allow_anyone = true

        [[deck.default_rerun_auth_configs]]
        repo = "*"
        config = { allow_anyone = true }
        "#,
    );

    assert!(matches!(
        result,
        Err(ConfigurationError::ConflictingConfiguration { .. })
    ));
}

/// Verify tide queries are deduplicated on load.
#[test]
fn test_finalize_dedups_tide_queries() {
    let config = Config::from_toml_str(
        r#"
        [[tide.queries]]
        orgs = ["a"]
        labels = ["lgtm"]

        [[tide.queries]]
        orgs = ["b"]
        labels = ["lgtm"]
        "#,
    )
    .unwrap();

    assert_eq!(config.tide.queries.len(), 1);
    assert_eq!(config.tide.queries[0].orgs, vec!["a", "b"]);
}

/// Verify finalize can run twice without changing the result.
#[test]
fn test_finalize_is_idempotent() {
    let mut config = enabled_config();
    let before = config.clone();

    config.finalize().unwrap();

    assert_eq!(config, before);
}

/// Verify static jobs are defaulted and validated.
#[test]
fn test_finalize_defaults_static_jobs() {
    let config = Config::from_toml_str(
        r#"
        decorate_all_jobs = true

        [[plank.default_decoration_config_entries]]
        repo = "*"

        [plank.default_decoration_config_entries.config]
        timeout_secs = 600

        [plank.default_decoration_config_entries.config.utility_images]
        clonerefs = "clonerefs:v1"
        initupload = "initupload:v1"
        entrypoint = "entrypoint:v1"
        sidecar = "sidecar:v1"

        [[jobs.presubmits."org/repo"]]
        name = "unit"
        "#,
    )
    .unwrap();
    let job = &config.static_presubmits("org/repo")[0];

    assert_eq!(job.base.cluster, DEFAULT_CLUSTER);
    assert_eq!(job.context, "unit");
    assert_eq!(job.base.decorate, Some(true));
    assert_eq!(
        job.base.decoration_config.as_ref().and_then(|d| d.timeout_secs),
        Some(600)
    );
    assert!(job.base.job_defaults.is_some());
}

/// Verify duplicate static job names are rejected.
#[test]
fn test_finalize_rejects_duplicate_static_jobs() {
    let result = Config::from_toml_str(
        r#"
        [[jobs.presubmits."org/repo"]]
        name = "unit"

        [[jobs.presubmits."org/repo"]]
        name = "unit"
        "#,
    );

    assert_eq!(
        result,
        Err(ConfigurationError::DuplicateJob {
            name: "unit".to_string(),
            repo: "org/repo".to_string(),
        })
    );
}

/// Verify periodics must carry a schedule.
#[test]
fn test_finalize_validates_periodics() {
    let result = Config::from_toml_str(
        r#"
        [[jobs.periodics]]
        name = "nightly"
        "#,
    );
    assert!(result.is_err());
}

// ============================================================================
// Resolution Helper Tests
// ============================================================================

/// Verify job defaults honour entry precedence and the tenant fallback.
#[test]
fn test_job_defaults_for() {
    let config = Config::from_toml_str(
        r#"
        [[plank.default_job_defaults_entries]]
        repo = "*"
        config = { resultstore_project = "results" }

        [[plank.default_job_defaults_entries]]
        repo = "org"
        cluster = "build"
        config = { tenant_id = "org-build" }
        "#,
    )
    .unwrap();

    let build = config.job_defaults_for("org/repo", "build", None);
    assert_eq!(build.tenant_id.as_deref(), Some("org-build"));
    assert_eq!(build.resultstore_project.as_deref(), Some("results"));

    let other = config.job_defaults_for("org/repo", "default", None);
    assert_eq!(other.tenant_id.as_deref(), Some(crate::settings::DEFAULT_TENANT_ID));
}

/// Verify the job's own rerun policy replaces the defaults.
#[test]
fn test_rerun_auth_for_own_policy_wins() {
    let config = Config::from_toml_str(
        r#"
        [deck.rerun_auth_configs."org"]
        github_orgs = ["org"]
        "#,
    )
    .unwrap();
    let own = RerunAuthConfig {
        github_users: vec!["alice".to_string()],
        ..Default::default()
    };

    assert_eq!(
        config.rerun_auth_for("org/repo", "default", None).github_orgs,
        vec!["org"]
    );
    assert_eq!(config.rerun_auth_for("org/repo", "default", Some(&own)), own);
}

/// Verify static jobs receive the resolved rerun policy unless they set one.
#[test]
fn test_finalize_resolves_job_rerun_policy() {
    let config = Config::from_toml_str(
        r#"
        [deck.rerun_auth_configs."org"]
        github_orgs = ["org"]

        [[jobs.presubmits."org/repo"]]
        name = "inherits"

        [[jobs.presubmits."org/repo"]]
        name = "owns"

        [jobs.presubmits."org/repo".rerun_auth_config]
        github_users = ["alice"]

        [[jobs.presubmits."other/repo"]]
        name = "unmatched"
        "#,
    )
    .unwrap();
    let jobs = config.static_presubmits("org/repo");

    assert_eq!(
        jobs[0].base.rerun_auth_config.as_ref().map(|p| p.github_orgs.clone()),
        Some(vec!["org".to_string()])
    );
    assert_eq!(
        jobs[1].base.rerun_auth_config.as_ref().map(|p| p.github_users.clone()),
        Some(vec!["alice".to_string()])
    );
    assert!(config.static_presubmits("other/repo")[0]
        .base
        .rerun_auth_config
        .is_none());
}

// ============================================================================
// In-repo Validation Tests
// ============================================================================

/// Verify in-repo jobs are defaulted like static ones.
#[test]
fn test_versioned_jobs_are_defaulted() {
    let config = enabled_config();
    let mut versioned = VersionedConfig {
        presubmits: vec![presubmit("unit", "")],
        ..Default::default()
    };

    config
        .default_and_validate_versioned("org/repo", &mut versioned)
        .unwrap();

    assert_eq!(versioned.presubmits[0].base.cluster, DEFAULT_CLUSTER);
    assert_eq!(versioned.presubmits[0].context, "unit");
}

/// Verify in-repo jobs must use an allowed cluster.
#[test]
fn test_versioned_jobs_cluster_allow_list() {
    let config = enabled_config();
    let mut versioned = VersionedConfig {
        presubmits: vec![presubmit("gpu-tests", "gpu")],
        ..Default::default()
    };

    let result = config.default_and_validate_versioned("org/repo", &mut versioned);

    assert_eq!(
        result,
        Err(ConfigurationError::ClusterNotAllowed {
            job: "gpu-tests".to_string(),
            cluster: "gpu".to_string(),
            identifier: "org/repo".to_string(),
        })
    );
}

/// Verify in-repo jobs may not reuse a static job name.
#[test]
fn test_versioned_jobs_collide_with_static_jobs() {
    let config = enabled_config();
    let mut versioned = VersionedConfig {
        presubmits: vec![presubmit("static-unit", "build")],
        ..Default::default()
    };

    let result = config.default_and_validate_versioned("org/repo", &mut versioned);

    assert!(matches!(result, Err(ConfigurationError::DuplicateJob { .. })));
}

/// Verify in-repo presets apply to in-repo jobs.
#[test]
fn test_versioned_presets_apply() {
    let config = enabled_config();
    let mut job = presubmit("unit", "");
    job.base
        .labels
        .insert("preset-cache".to_string(), "true".to_string());
    let mut versioned = VersionedConfig {
        presets: vec![Preset {
            labels: [("preset-cache".to_string(), "true".to_string())]
                .into_iter()
                .collect(),
            env: [("CACHE".to_string(), "on".to_string())].into_iter().collect(),
        }],
        presubmits: vec![job],
        ..Default::default()
    };

    config
        .default_and_validate_versioned("org/repo", &mut versioned)
        .unwrap();

    assert_eq!(
        versioned.presubmits[0].base.env.get("CACHE").map(String::as_str),
        Some("on")
    );
}

/// Verify static jobs are looked up by identifier without its scheme.
#[test]
fn test_static_jobs_lookup() {
    let config = enabled_config();
    assert_eq!(config.static_presubmits("org/repo").len(), 1);
    assert!(config
        .static_presubmits("https://host.example/org/repo")
        .is_empty());
    assert!(config.static_postsubmits("org/repo").is_empty());
}

/// Verify a decorated job without utility images is rejected.
#[test]
fn test_finalize_rejects_incomplete_decoration() {
    let result = Config::from_toml_str(
        r#"
        decorate_all_jobs = true

        [[jobs.postsubmits."org/repo"]]
        name = "publish"
        "#,
    );

    assert!(matches!(
        result,
        Err(ConfigurationError::InvalidConfiguration { .. })
    ));
}
