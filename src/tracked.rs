//! Tracked identifier set: discovered family members plus overrides, minus
//! the blocklist.
//!
//! All set operations compare on a lower-cased key kept separate from the
//! display casing, so `Cerbi.Core` and `cerbi.core` are one package.
use crate::search::SearchEntry;
use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Canonical key for case-insensitive identifier comparison.
pub fn canonical_id(id: &str) -> String {
    id.to_lowercase()
}

/// Discovered ids that belong to the family, in discovery order.
pub fn discovered_family_ids(discovered: &[SearchEntry], family_prefix: &str) -> Vec<String> {
    let prefix = canonical_id(family_prefix);
    discovered
        .iter()
        .filter(|entry| canonical_id(&entry.id).starts_with(&prefix))
        .map(|entry| entry.id.clone())
        .collect()
}

/// Build the sorted list of identifiers to snapshot.
///
/// Overrides bypass the prefix filter. The first casing seen wins, with
/// discovered ids ahead of overrides.
pub fn build_tracked_ids(
    discovered: &[SearchEntry],
    family_prefix: &str,
    overrides: &[String],
    blocklist: &[String],
) -> Vec<String> {
    let blocked: HashSet<String> = blocklist
        .iter()
        .map(String::as_str)
        .map(canonical_id)
        .collect();
    let mut seen = HashSet::new();
    let mut tracked = Vec::new();

    let candidates = discovered_family_ids(discovered, family_prefix)
        .into_iter()
        .chain(overrides.iter().cloned());
    for id in candidates {
        if id.trim().is_empty() {
            continue;
        }
        let key = canonical_id(&id);
        if blocked.contains(&key) || !seen.insert(key) {
            continue;
        }
        tracked.push(id);
    }
    tracked.sort();
    tracked
}

/// Load an optional JSON array of package ids.
///
/// A missing file is an empty list. Strings are trimmed and empty ones
/// skipped; numbers and booleans are taken as their text.
pub fn load_id_list(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let value: Value =
        serde_json::from_slice(&bytes).with_context(|| format!("parse {}", path.display()))?;
    let Value::Array(items) = value else {
        return Err(anyhow!(
            "{} must contain a JSON array of package ids",
            path.display()
        ));
    };

    let mut ids = Vec::new();
    for (index, item) in items.into_iter().enumerate() {
        let raw = match item {
            Value::String(text) => text,
            Value::Number(number) => number.to_string(),
            Value::Bool(flag) => flag.to_string(),
            _ => {
                tracing::warn!(path = %path.display(), index, "skipping non-scalar package id");
                continue;
            }
        };
        let id = raw.trim();
        if !id.is_empty() {
            ids.push(id.to_string());
        }
    }
    Ok(ids)
}
