//! Snapshot and history persistence.
//!
//! The daily snapshot is replaced atomically; the CSV history is append-only
//! and never rewritten.
use crate::paths::DataPaths;
use crate::snapshot::{DailySnapshot, PackageRecord};
use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::PathBuf;

/// Header line of the rolling history CSV.
pub const HISTORY_HEADER: &str = "date,id,totalDownloads,latestVersion";

/// Write `daily/<date>.json`, overwriting any snapshot for the same date.
pub fn write_daily_snapshot(paths: &DataPaths, snapshot: &DailySnapshot) -> Result<PathBuf> {
    let dir = paths.daily_dir();
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    let path = paths.daily_snapshot_path(&snapshot.date_utc);
    let text = serde_json::to_string_pretty(snapshot).context("serialize daily snapshot")?;

    let mut staged = tempfile::NamedTempFile::new_in(&dir)
        .with_context(|| format!("create temp file in {}", dir.display()))?;
    staged
        .write_all(text.as_bytes())
        .with_context(|| format!("write {}", staged.path().display()))?;
    staged
        .persist(&path)
        .map_err(|err| err.error)
        .with_context(|| format!("write {}", path.display()))?;

    tracing::info!(
        path = %path.display(),
        packages = snapshot.packages.len(),
        "daily snapshot written"
    );
    Ok(path)
}

/// Append one row per found package, creating the file with a header first.
///
/// Returns the history path and the number of rows appended.
pub fn append_history(paths: &DataPaths, snapshot: &DailySnapshot) -> Result<(PathBuf, usize)> {
    let path = paths.history_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let needs_header = !path.exists();

    let mut text = String::new();
    if needs_header {
        text.push_str(HISTORY_HEADER);
        text.push('\n');
    }
    let mut rows = 0;
    for record in snapshot.packages.iter().filter(|record| record.found) {
        text.push_str(&history_row(&snapshot.date_utc, record));
        rows += 1;
    }

    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("open {}", path.display()))?;
    file.write_all(text.as_bytes())
        .with_context(|| format!("write {}", path.display()))?;

    tracing::info!(path = %path.display(), rows, needs_header, "history appended");
    Ok((path, rows))
}

fn history_row(date_utc: &str, record: &PackageRecord) -> String {
    let total = record.total_downloads.unwrap_or(0).to_string();
    let latest = record.latest_version.as_deref().unwrap_or_default();
    format!(
        "{},{},{total},{}\n",
        csv_field(date_utc),
        csv_field(&record.id),
        csv_field(latest)
    )
}

/// Quote a field only when it contains a delimiter, quote, or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
