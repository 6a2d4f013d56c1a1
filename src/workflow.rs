//! Run orchestration for the CLI commands.
//!
//! Every network request of a run completes before the first file is
//! written, so a fatal error never leaves a partial snapshot behind.
use crate::cli::{InitArgs, LookupArgs, SnapshotArgs};
use crate::config::{
    self, TrackerConfig, DEFAULT_BLOCKLIST_FILE, DEFAULT_CONFIG_FILE, DEFAULT_OVERRIDES_FILE,
};
use crate::history::{append_history, write_daily_snapshot};
use crate::http::{JsonSource, UreqSource};
use crate::search::{search_all, search_page, SearchEntry, Termination};
use crate::service_index::{fetch_service_index, resolve_endpoint};
use crate::snapshot::{normalize, DailySnapshot, PackageRecord};
use crate::tracked::{build_tracked_ids, canonical_id, discovered_family_ids, load_id_list};
use anyhow::{anyhow, Context, Result};
use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Results requested per exact-id lookup; only the matching hit is kept.
const LOOKUP_TAKE: usize = 20;

/// What a run did, printed to stdout on success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub lines: Vec<String>,
}

impl RunSummary {
    fn print(&self) {
        for line in &self.lines {
            println!("{line}");
        }
    }
}

/// Run the bulk-discovery snapshot.
pub fn run_snapshot(args: &SnapshotArgs) -> Result<()> {
    let config = config::resolve_config(&args.tracker)?;
    let source = UreqSource::new(config.timeout());
    let summary = snapshot_run(&source, &config, Utc::now().date_naive())?;
    summary.print();
    Ok(())
}

/// Run the per-id lookup snapshot.
pub fn run_lookup(args: &LookupArgs) -> Result<()> {
    let config = config::resolve_config(&args.tracker)?;
    let source = UreqSource::new(config.timeout());
    let today = Utc::now().date_naive();
    let summary = lookup_run(&source, &config, args.ids.as_deref(), today)?;
    summary.print();
    Ok(())
}

fn search_endpoint(source: &dyn JsonSource, config: &TrackerConfig) -> Result<String> {
    let index = fetch_service_index(source, &config.index_url)?;
    resolve_endpoint(&index, &config.capability_prefix)
        .map(str::to_string)
        .ok_or_else(|| {
            anyhow!(
                "{} not found in service index {}",
                config.capability_prefix,
                config.index_url
            )
        })
}

/// Discover the family through paged search and persist today's snapshot.
pub(crate) fn snapshot_run(
    source: &dyn JsonSource,
    config: &TrackerConfig,
    date: NaiveDate,
) -> Result<RunSummary> {
    let overrides = load_id_list(&config.overrides_path)?;
    let blocklist = load_id_list(&config.blocklist_path)?;
    let endpoint = search_endpoint(source, config)?;
    let outcome = search_all(source, &endpoint, &config.search_params())?;
    tracing::info!(
        endpoint = %endpoint,
        pages = outcome.pages,
        entries = outcome.entries.len(),
        "discovery complete"
    );

    let family = discovered_family_ids(&outcome.entries, &config.family_prefix);
    let tracked = build_tracked_ids(
        &outcome.entries,
        &config.family_prefix,
        &overrides,
        &blocklist,
    );
    let snapshot = DailySnapshot::new(date, normalize(&tracked, &outcome.entries));

    let mut lines = vec![
        format!(
            "Discovered {} {} packages",
            family.len(),
            config.family_prefix
        ),
        format!(
            "Tracking {} packages after merge/blocklist",
            snapshot.packages.len()
        ),
    ];
    if let Termination::CeilingReached { next_offset } = outcome.termination {
        lines.push(format!(
            "Search stopped at offset ceiling {} (next offset {next_offset}); results may be incomplete",
            config.max_offset
        ));
    }
    persist(config, &snapshot, lines)
}

/// Look up each listed id with its own exact-match query.
///
/// A failed request only affects that id, which is recorded as not found
/// with the failure message.
pub(crate) fn lookup_run(
    source: &dyn JsonSource,
    config: &TrackerConfig,
    ids_path: Option<&Path>,
    date: NaiveDate,
) -> Result<RunSummary> {
    let requested = load_id_list(ids_path.unwrap_or(config.overrides_path.as_path()))?;
    let blocklist = load_id_list(&config.blocklist_path)?;
    let tracked = build_tracked_ids(&[], &config.family_prefix, &requested, &blocklist);
    let endpoint = search_endpoint(source, config)?;

    let mut entries = Vec::new();
    let mut failures = HashMap::new();
    for id in &tracked {
        match lookup_package(source, &endpoint, id) {
            Ok(Some(entry)) => entries.push(entry),
            Ok(None) => {}
            Err(err) => {
                let message = format!("{err:#}");
                tracing::warn!(id = %id, error = %message, "package lookup failed");
                failures.insert(canonical_id(id), message);
            }
        }
    }

    let mut packages = normalize(&tracked, &entries);
    for record in &mut packages {
        if let Some(message) = failures.remove(&canonical_id(&record.id)) {
            *record = PackageRecord::not_found(&record.id, &message);
        }
    }
    let snapshot = DailySnapshot::new(date, packages);

    let lines = vec![format!(
        "Looked up {} packages ({} found)",
        snapshot.packages.len(),
        snapshot.found_count()
    )];
    persist(config, &snapshot, lines)
}

fn lookup_package(
    source: &dyn JsonSource,
    endpoint: &str,
    id: &str,
) -> Result<Option<SearchEntry>> {
    let query = format!("packageid:{id}");
    let key = canonical_id(id);
    let page = search_page(source, endpoint, &query, 0, LOOKUP_TAKE)?;
    Ok(page.into_iter().find(|hit| canonical_id(&hit.id) == key))
}

fn persist(
    config: &TrackerConfig,
    snapshot: &DailySnapshot,
    mut lines: Vec<String>,
) -> Result<RunSummary> {
    let paths = config.data_paths();
    let daily_path = write_daily_snapshot(&paths, snapshot)?;
    let (history_path, rows) = append_history(&paths, snapshot)?;
    lines.push(format!("Wrote {}", daily_path.display()));
    lines.push(format!("Appended {} ({rows} rows)", history_path.display()));
    Ok(RunSummary { lines })
}

/// Write a default config and empty id lists into `args.dir`.
pub fn run_init(args: &InitArgs) -> Result<()> {
    for path in init_dir(&args.dir, args.force)? {
        println!("wrote {}", path.display());
    }
    Ok(())
}

fn init_dir(dir: &Path, force: bool) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    let config_path = dir.join(DEFAULT_CONFIG_FILE);
    if config_path.is_file() && !force {
        return Err(anyhow!(
            "config already exists at {} (use --force to overwrite)",
            config_path.display()
        ));
    }
    let mut written = Vec::new();
    let stub = config::config_stub()?;
    fs::write(&config_path, stub.as_bytes())
        .with_context(|| format!("write {}", config_path.display()))?;
    written.push(config_path);

    // Existing id lists are operator data and survive --force.
    for name in [DEFAULT_OVERRIDES_FILE, DEFAULT_BLOCKLIST_FILE] {
        let path = dir.join(name);
        if path.exists() {
            continue;
        }
        fs::write(&path, b"[]\n").with_context(|| format!("write {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}
