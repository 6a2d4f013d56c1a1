//! CLI argument parsing for the snapshot workflow.
//!
//! Flags only override the config file; all defaults live in `config`.
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "ntrends",
    version,
    about = "Daily download snapshots for a family of NuGet packages",
    after_help = "Commands:\n  snapshot   Discover the package family via search and record today's totals\n  lookup     Record today's totals for an explicit id list, one query per id\n  init       Write a default ntrends.json and empty override/blocklist files\n\nExamples:\n  ntrends init\n  ntrends snapshot\n  ntrends snapshot --prefix cerbi --data-dir data\n  ntrends lookup --ids packages.override.json",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    Snapshot(SnapshotArgs),
    Lookup(LookupArgs),
    Init(InitArgs),
}

impl Command {
    /// Whether debug logging was requested.
    pub fn verbose(&self) -> bool {
        match self {
            Command::Snapshot(args) => args.tracker.verbose,
            Command::Lookup(args) => args.tracker.verbose,
            Command::Init(_) => false,
        }
    }
}

/// Settings shared by every command that talks to the index.
#[derive(Args, Debug, Clone, Default)]
pub struct TrackerArgs {
    /// Config file (defaults to ./ntrends.json when present)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory receiving daily/ snapshots and the history CSV
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Service index URL
    #[arg(long, value_name = "URL")]
    pub index_url: Option<String>,

    /// Free-text search query used for discovery
    #[arg(long, value_name = "TEXT")]
    pub query: Option<String>,

    /// Package id prefix that defines the tracked family
    #[arg(long, value_name = "PREFIX")]
    pub prefix: Option<String>,

    /// Highest search offset requested before paging stops
    #[arg(long, value_name = "N")]
    pub max_offset: Option<usize>,

    /// JSON array of ids to always track
    #[arg(long, value_name = "PATH")]
    pub overrides: Option<PathBuf>,

    /// JSON array of ids to never track
    #[arg(long, value_name = "PATH")]
    pub blocklist: Option<PathBuf>,

    /// Emit debug logs to stderr
    #[arg(long)]
    pub verbose: bool,
}

/// Snapshot command inputs.
#[derive(Parser, Debug)]
#[command(about = "Discover packages via search and record today's download totals")]
pub struct SnapshotArgs {
    #[command(flatten)]
    pub tracker: TrackerArgs,
}

/// Lookup command inputs.
#[derive(Parser, Debug)]
#[command(about = "Record today's download totals for an explicit list of ids")]
pub struct LookupArgs {
    #[command(flatten)]
    pub tracker: TrackerArgs,

    /// JSON array of ids to look up (defaults to the override file)
    #[arg(long, value_name = "PATH")]
    pub ids: Option<PathBuf>,
}

/// Init command inputs.
#[derive(Parser, Debug)]
#[command(about = "Write a default config and empty id lists")]
pub struct InitArgs {
    /// Directory to initialize
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub dir: PathBuf,

    /// Overwrite an existing ntrends.json
    #[arg(long)]
    pub force: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        RootArgs::command().debug_assert();
    }

    #[test]
    fn snapshot_flags_parse() {
        let args = RootArgs::try_parse_from([
            "ntrends",
            "snapshot",
            "--prefix",
            "Acme",
            "--max-offset",
            "400",
            "--verbose",
        ])
        .unwrap();
        assert!(args.command.verbose());
        let Command::Snapshot(snapshot) = args.command else {
            panic!("expected snapshot");
        };
        assert_eq!(snapshot.tracker.prefix.as_deref(), Some("Acme"));
        assert_eq!(snapshot.tracker.max_offset, Some(400));
        assert!(snapshot.tracker.config.is_none());
    }

    #[test]
    fn missing_subcommand_is_an_error() {
        assert!(RootArgs::try_parse_from(["ntrends"]).is_err());
    }
}
