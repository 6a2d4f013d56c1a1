//! Typed paths into the data directory.
//!
//! Centralizing path construction keeps the snapshot and history writers in
//! agreement about the layout.
use std::path::PathBuf;

/// Locations of persisted artifacts under a data directory.
#[derive(Debug, Clone)]
pub struct DataPaths {
    root: PathBuf,
    history_file: String,
}

impl DataPaths {
    /// Create a path helper rooted at the data directory.
    pub fn new(root: PathBuf, history_file: impl Into<String>) -> Self {
        Self {
            root,
            history_file: history_file.into(),
        }
    }

    /// Return the `daily/` directory path.
    pub fn daily_dir(&self) -> PathBuf {
        self.root.join("daily")
    }

    /// Return the `daily/<date>.json` path for a `YYYY-MM-DD` date.
    pub fn daily_snapshot_path(&self, date_utc: &str) -> PathBuf {
        self.daily_dir().join(format!("{date_utc}.json"))
    }

    /// Return the rolling CSV history path.
    pub fn history_path(&self) -> PathBuf {
        self.root.join(&self.history_file)
    }
}
