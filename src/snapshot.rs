//! Daily snapshot records.
//!
//! Every tracked id produces exactly one record, found or not, so the
//! snapshot shape stays stable from day to day.
use crate::search::{SearchEntry, VersionDownloads};
use crate::tracked::canonical_id;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Reason recorded when a tracked id has no matching search hit.
pub const NOT_FOUND_IN_SEARCH: &str = "Not found in search results";

/// One package's entry in the daily snapshot.
///
/// Found records carry the download fields; not-found records carry only
/// `id`, `found` and `error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageRecord {
    pub id: String,
    pub found: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_downloads: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub versions: Option<Vec<VersionDownloads>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PackageRecord {
    /// Record for a package present in search results, using its casing.
    pub fn found(entry: &SearchEntry) -> Self {
        Self {
            id: entry.id.clone(),
            found: true,
            total_downloads: Some(entry.total_downloads),
            latest_version: Some(entry.version.clone()),
            versions: Some(entry.versions.clone()),
            error: None,
        }
    }

    /// Record for a tracked id with no search hit.
    pub fn not_found(id: &str, reason: &str) -> Self {
        Self {
            id: id.to_string(),
            found: false,
            total_downloads: None,
            latest_version: None,
            versions: None,
            error: Some(reason.to_string()),
        }
    }
}

/// All records captured for one UTC date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySnapshot {
    pub date_utc: String,
    pub packages: Vec<PackageRecord>,
}

impl DailySnapshot {
    /// Create a snapshot stamped with `date` as `YYYY-MM-DD`.
    pub fn new(date: NaiveDate, packages: Vec<PackageRecord>) -> Self {
        Self {
            date_utc: date.format("%Y-%m-%d").to_string(),
            packages,
        }
    }

    /// Number of records with a search hit.
    pub fn found_count(&self) -> usize {
        self.packages.iter().filter(|record| record.found).count()
    }
}

/// Map tracked ids to records, in tracked order.
///
/// Lookup is case-insensitive; when search returned the same id twice the
/// first hit is used.
pub fn normalize(tracked: &[String], discovered: &[SearchEntry]) -> Vec<PackageRecord> {
    let mut by_key: HashMap<String, &SearchEntry> = HashMap::new();
    for entry in discovered {
        by_key.entry(canonical_id(&entry.id)).or_insert(entry);
    }
    tracked
        .iter()
        .map(|id| match by_key.get(&canonical_id(id)) {
            Some(entry) => PackageRecord::found(entry),
            None => PackageRecord::not_found(id, NOT_FOUND_IN_SEARCH),
        })
        .collect()
}
