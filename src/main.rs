use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod history;
mod http;
mod paths;
mod search;
mod service_index;
mod snapshot;
mod tracked;
mod workflow;

use cli::{Command, RootArgs};

fn main() -> Result<()> {
    let args = RootArgs::parse();
    init_tracing(args.command.verbose());

    match args.command {
        Command::Snapshot(args) => workflow::run_snapshot(&args),
        Command::Lookup(args) => workflow::run_lookup(&args),
        Command::Init(args) => workflow::run_init(&args),
    }
}

/// `RUST_LOG` wins; otherwise `--verbose` selects debug and the default is
/// warnings only. Logs go to stderr so stdout stays a clean summary.
fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            "ntrends=debug"
        } else {
            "ntrends=warn"
        })
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
