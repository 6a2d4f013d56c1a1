//! Tracker configuration.
//!
//! Settings resolve in three layers: built-in defaults, then an optional
//! `ntrends.json`, then CLI flags. The result is validated once before any
//! network or file work starts.
use crate::cli::TrackerArgs;
use crate::paths::DataPaths;
use crate::search::{SearchParams, DEFAULT_MAX_OFFSET, DEFAULT_PAGE_SIZE};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "ntrends.json";
pub const DEFAULT_INDEX_URL: &str = "https://api.nuget.org/v3/index.json";
pub const DEFAULT_CAPABILITY_PREFIX: &str = "searchqueryservice";
pub const DEFAULT_FAMILY: &str = "cerbi";
pub const DEFAULT_OVERRIDES_FILE: &str = "packages.override.json";
pub const DEFAULT_BLOCKLIST_FILE: &str = "packages.blocklist.json";
pub const DEFAULT_HISTORY_FILE: &str = "nuget_daily_totals.csv";

/// Resolved settings for one run. Relative paths resolve against the
/// working directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrackerConfig {
    pub index_url: String,
    pub capability_prefix: String,
    pub query: String,
    pub family_prefix: String,
    pub page_size: usize,
    pub max_offset: usize,
    pub data_dir: PathBuf,
    pub history_file: String,
    pub overrides_path: PathBuf,
    pub blocklist_path: PathBuf,
    pub timeout_secs: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            index_url: DEFAULT_INDEX_URL.to_string(),
            capability_prefix: DEFAULT_CAPABILITY_PREFIX.to_string(),
            query: DEFAULT_FAMILY.to_string(),
            family_prefix: DEFAULT_FAMILY.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            max_offset: DEFAULT_MAX_OFFSET,
            data_dir: PathBuf::from("data"),
            history_file: DEFAULT_HISTORY_FILE.to_string(),
            overrides_path: PathBuf::from(DEFAULT_OVERRIDES_FILE),
            blocklist_path: PathBuf::from(DEFAULT_BLOCKLIST_FILE),
            timeout_secs: 60,
        }
    }
}

impl TrackerConfig {
    /// Query and paging limits for discovery.
    pub fn search_params(&self) -> SearchParams {
        SearchParams {
            query: self.query.clone(),
            page_size: self.page_size,
            max_offset: self.max_offset,
        }
    }

    /// Path helper rooted at the configured data directory.
    pub fn data_paths(&self) -> DataPaths {
        DataPaths::new(self.data_dir.clone(), self.history_file.clone())
    }

    /// Per-request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Render the default config as pretty JSON.
pub fn config_stub() -> Result<String> {
    serde_json::to_string_pretty(&TrackerConfig::default()).context("serialize config stub")
}

/// Load a config file; omitted keys keep their defaults.
pub fn load_config(path: &Path) -> Result<TrackerConfig> {
    let bytes = fs::read(path).with_context(|| format!("read config {}", path.display()))?;
    let config: TrackerConfig = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse config {}", path.display()))?;
    Ok(config)
}

/// Resolve defaults, config file and flags into a validated config.
pub fn resolve_config(args: &TrackerArgs) -> Result<TrackerConfig> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => {
            let implicit = Path::new(DEFAULT_CONFIG_FILE);
            if implicit.is_file() {
                load_config(implicit)?
            } else {
                TrackerConfig::default()
            }
        }
    };
    apply_overrides(&mut config, args);
    validate_config(&config)?;
    Ok(config)
}

fn apply_overrides(config: &mut TrackerConfig, args: &TrackerArgs) {
    if let Some(data_dir) = &args.data_dir {
        config.data_dir = data_dir.clone();
    }
    if let Some(index_url) = &args.index_url {
        config.index_url = index_url.clone();
    }
    if let Some(query) = &args.query {
        config.query = query.clone();
    }
    if let Some(prefix) = &args.prefix {
        config.family_prefix = prefix.clone();
    }
    if let Some(max_offset) = args.max_offset {
        config.max_offset = max_offset;
    }
    if let Some(overrides) = &args.overrides {
        config.overrides_path = overrides.clone();
    }
    if let Some(blocklist) = &args.blocklist {
        config.blocklist_path = blocklist.clone();
    }
}

/// Reject settings that would make a run meaningless or loop forever.
pub fn validate_config(config: &TrackerConfig) -> Result<()> {
    let url = url::Url::parse(&config.index_url)
        .with_context(|| format!("index_url is not a valid URL ({:?})", config.index_url))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(anyhow!(
            "index_url must use http or https (got {:?})",
            config.index_url
        ));
    }
    for (label, value) in [
        ("capability_prefix", &config.capability_prefix),
        ("query", &config.query),
        ("family_prefix", &config.family_prefix),
    ] {
        if value.trim().is_empty() {
            return Err(anyhow!("{label} must be non-empty"));
        }
    }
    if config.page_size == 0 {
        return Err(anyhow!("page_size must be positive"));
    }
    if config.timeout_secs == 0 {
        return Err(anyhow!("timeout_secs must be positive"));
    }
    let mut components = Path::new(&config.history_file).components();
    if !matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) {
        return Err(anyhow!(
            "history_file must be a bare file name (got {:?})",
            config.history_file
        ));
    }
    Ok(())
}
