//! Migration of the flat, map-keyed default format to ordered entries.
//!
//! Older configuration files express defaults as a map from `org`,
//! `org/repo`, `*` or `""` to a payload. The map carries no order, so the
//! migration imposes one that lets the most specific key win once the entries
//! are resolved: `""` first, then `*`, then organizations, then repositories.
//! Keys of the same kind keep the map's own order.

use crate::errors::{ConfigurationError, ConfigurationResult};
use crate::merger::{DefaultEntry, WILDCARD};
use std::collections::BTreeMap;
use tracing::debug;

#[cfg(test)]
#[path = "legacy_tests.rs"]
mod tests;

/// Converts a legacy map into precedence entries matching any cluster.
pub fn migrate_legacy_map<T: Clone>(legacy: &BTreeMap<String, T>) -> Vec<DefaultEntry<T>> {
    let mut ordered: Vec<(&String, &T)> = legacy.iter().collect();
    ordered.sort_by_key(|(key, _)| specificity(key));

    ordered
        .into_iter()
        .map(|(key, config)| DefaultEntry::new(key.as_str(), "", config.clone()))
        .collect()
}

fn specificity(key: &str) -> u8 {
    if key.is_empty() {
        0
    } else if key == WILDCARD {
        1
    } else if !key.contains('/') {
        2
    } else {
        3
    }
}

/// Moves a legacy map into an entry list, refusing to combine the two.
///
/// `legacy_field` and `entries_field` name the two configuration surfaces in
/// the error. The legacy map is drained; when it was empty the entries are left
/// as they are.
///
/// # Errors
///
/// Returns `ConfigurationError::ConflictingConfiguration` when both the map
/// and the entry list are non-empty.
pub fn merge_legacy_entries<T: Clone>(
    legacy_field: &str,
    legacy: &mut BTreeMap<String, T>,
    entries_field: &str,
    entries: &mut Vec<DefaultEntry<T>>,
) -> ConfigurationResult<()> {
    if legacy.is_empty() {
        return Ok(());
    }
    if !entries.is_empty() {
        return Err(ConfigurationError::ConflictingConfiguration {
            legacy: legacy_field.to_string(),
            current: entries_field.to_string(),
        });
    }

    debug!(
        field = legacy_field,
        keys = legacy.len(),
        "Migrating legacy defaults to {}",
        entries_field
    );
    *entries = migrate_legacy_map(legacy);
    legacy.clear();
    Ok(())
}
