//! Tests for inspection commands.

use super::*;

fn config() -> Config {
    Config::from_toml_str(
        r#"
        [plank.default_decoration_configs."*"]
        timeout_secs = 7200

        [plank.default_decoration_configs."org/repo"]
        skip_cloning = true

        [deck.rerun_auth_configs."org"]
        github_users = ["alice"]

        [in_repo_config.enabled]
        "org" = true
        "org/legacy" = false

        [in_repo_config.allowed_clusters]
        "org" = ["build"]

        [[tide.queries]]
        orgs = ["a"]
        labels = ["lgtm"]

        [[tide.queries]]
        orgs = ["b"]
        labels = ["lgtm"]

        [[jobs.presubmits."org/repo"]]
        name = "unit"
        "#,
    )
    .expect("Failed to parse config")
}

fn resolve_args(repo: &str, format: OutputFormat) -> ResolveArgs {
    ResolveArgs {
        repo: repo.to_string(),
        cluster: "build".to_string(),
        format,
    }
}

#[test]
fn test_check_summarises_configuration() {
    let output = check(&config());

    assert!(output.contains("Configuration is valid"));
    assert!(output.contains("Decoration default entries: 2"));
    assert!(output.contains("Rerun auth entries: 1"));
    assert!(output.contains("Tide queries: 1"));
    assert!(output.contains("Static presubmits: 1 in 1 repositories"));
}

#[test]
fn test_resolve_defaults_as_json() {
    let output = resolve_defaults(&config(), &resolve_args("org/repo", OutputFormat::Json)).unwrap();

    let value: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(value["decoration_config"]["timeout_secs"], 7200);
    assert_eq!(value["decoration_config"]["skip_cloning"], true);
    assert_eq!(value["rerun_auth_config"]["github_users"][0], "alice");
    assert_eq!(value["job_defaults"]["tenant_id"], job_config::DEFAULT_TENANT_ID);
}

#[test]
fn test_resolve_defaults_as_toml() {
    let output = resolve_defaults(&config(), &resolve_args("org/other", OutputFormat::Toml)).unwrap();

    assert!(output.contains("timeout_secs = 7200"));
    assert!(!output.contains("skip_cloning"));
}

#[test]
fn test_resolve_defaults_rejects_bare_org() {
    let result = resolve_defaults(&config(), &resolve_args("org", OutputFormat::Json));
    assert!(matches!(result, Err(Error::InvalidArguments(_))));
}

#[test]
fn test_in_repo_status() {
    let status = in_repo_status(
        &config(),
        &InRepoArgs {
            identifier: "org/repo".to_string(),
            cluster: Some("build".to_string()),
        },
    );

    assert!(status.enabled);
    assert_eq!(status.allowed_clusters, vec!["build"]);
    assert_eq!(status.cluster_allowed, Some(true));
}

#[test]
fn test_in_repo_status_for_opted_out_repo() {
    let status = in_repo_status(
        &config(),
        &InRepoArgs {
            identifier: "org/legacy".to_string(),
            cluster: None,
        },
    );

    assert!(!status.enabled);
    assert!(status.cluster_allowed.is_none());
}

#[test]
fn test_tide_queries_are_deduplicated() {
    let queries = tide_queries(&config());

    assert_eq!(
        queries,
        vec![r#"is:pr state:open archived:false org:"a" org:"b" label:"lgtm""#]
    );
}
