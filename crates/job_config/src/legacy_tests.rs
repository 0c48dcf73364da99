//! Tests for legacy default migration.

use super::*;
use crate::merger::resolve;
use crate::settings::{DecorationConfig, JobDefaults};

fn legacy(keys: &[(&str, &str)]) -> BTreeMap<String, JobDefaults> {
    keys.iter()
        .map(|(key, tenant)| (key.to_string(), JobDefaults::with_tenant(*tenant)))
        .collect()
}

/// Verify entries are ordered from least to most specific.
#[test]
fn test_migration_orders_by_specificity() {
    let map = legacy(&[
        ("org/repo", "repo"),
        ("org", "org"),
        ("*", "star"),
        ("", "empty"),
    ]);

    let entries = migrate_legacy_map(&map);
    let keys: Vec<&str> = entries.iter().map(|e| e.org_repo.as_str()).collect();

    assert_eq!(keys, vec!["", "*", "org", "org/repo"]);
    assert!(entries.iter().all(|e| e.cluster.is_empty()));
}

/// Verify keys of the same kind keep map order.
#[test]
fn test_migration_keeps_map_order_within_kind() {
    let map = legacy(&[("b", "b"), ("a", "a"), ("b/x", "bx"), ("a/y", "ay")]);

    let keys: Vec<String> = migrate_legacy_map(&map)
        .into_iter()
        .map(|e| e.org_repo)
        .collect();

    assert_eq!(keys, vec!["a", "b", "a/y", "b/x"]);
}

/// Verify migrated entries resolve to the same result as the legacy lookup.
#[test]
fn test_migration_preserves_resolution() {
    let mut map = BTreeMap::new();
    map.insert(
        "*".to_string(),
        DecorationConfig {
            timeout_secs: Some(100),
            skip_cloning: Some(false),
            ..Default::default()
        },
    );
    map.insert(
        "org".to_string(),
        DecorationConfig {
            timeout_secs: Some(200),
            ..Default::default()
        },
    );
    map.insert(
        "org/repo".to_string(),
        DecorationConfig {
            skip_cloning: Some(true),
            ..Default::default()
        },
    );

    let entries = migrate_legacy_map(&map);

    let repo = resolve(&entries, "org/repo", "default", None);
    assert_eq!(repo.timeout_secs, Some(200));
    assert_eq!(repo.skip_cloning, Some(true));

    let sibling = resolve(&entries, "org/other", "default", None);
    assert_eq!(sibling.timeout_secs, Some(200));
    assert_eq!(sibling.skip_cloning, Some(false));

    let stranger = resolve(&entries, "else/repo", "default", None);
    assert_eq!(stranger.timeout_secs, Some(100));
}

/// Verify an empty map migrates to no entries.
#[test]
fn test_migration_of_empty_map() {
    let entries = migrate_legacy_map(&BTreeMap::<String, JobDefaults>::new());
    assert!(entries.is_empty());
}

/// Verify merging moves the map into an empty entry list.
#[test]
fn test_merge_moves_legacy_into_entries() {
    let mut map = legacy(&[("org", "org")]);
    let mut entries = Vec::new();

    merge_legacy_entries("legacy", &mut map, "entries", &mut entries).unwrap();

    assert!(map.is_empty());
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].org_repo, "org");
}

/// Verify merging leaves entries alone when there is nothing legacy.
#[test]
fn test_merge_without_legacy_keeps_entries() {
    let mut map = BTreeMap::new();
    let mut entries = vec![DefaultEntry::new("*", "", JobDefaults::with_tenant("t"))];

    merge_legacy_entries("legacy", &mut map, "entries", &mut entries).unwrap();

    assert_eq!(entries.len(), 1);
}

/// Verify setting both surfaces is rejected.
#[test]
fn test_merge_rejects_both_surfaces() {
    let mut map = legacy(&[("org", "org")]);
    let mut entries = vec![DefaultEntry::new("*", "", JobDefaults::with_tenant("t"))];

    let result = merge_legacy_entries(
        "default_decoration_configs",
        &mut map,
        "default_decoration_config_entries",
        &mut entries,
    );

    assert_eq!(
        result,
        Err(ConfigurationError::ConflictingConfiguration {
            legacy: "default_decoration_configs".to_string(),
            current: "default_decoration_config_entries".to_string(),
        })
    );
    assert_eq!(map.len(), 1);
}
