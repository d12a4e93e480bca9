//! Client-side model for a polled taskboard: board layout, per-tab cell
//! state, derived view facts, and the reconciliation of server snapshots
//! with local edits.

pub mod aggregate;
pub mod board;
pub mod reconcile;
pub mod state;
pub mod sync;

#[cfg(feature = "native")]
pub mod cli;
#[cfg(feature = "native")]
pub mod commands;
#[cfg(feature = "native")]
pub mod config;
#[cfg(feature = "native")]
pub mod http;
#[cfg(feature = "native")]
pub mod render;

pub use aggregate::{Aggregator, ViewFacts};
pub use board::{ALL_TAB, BoardModel, CellKind};
pub use reconcile::Session;
pub use state::{CellValue, StateStore};
pub use sync::{SyncIntervals, SyncScheduler};

#[cfg(feature = "native")]
#[tracing::instrument(skip_all)]
pub fn run(raw_args: Vec<std::ffi::OsString>) -> anyhow::Result<()> {
    use anyhow::Context;
    use clap::Parser;
    use tracing::{debug, info};

    let cli = cli::GlobalCli::parse_from(raw_args);

    cli::init_tracing(cli.verbose, cli.quiet)?;

    info!(
        verbose = cli.verbose,
        quiet = cli.quiet,
        "starting taskboard client"
    );

    let mut cfg = config::Config::load(cli.config.as_deref())?;
    cfg.apply_overrides(
        cli.rc_overrides
            .into_iter()
            .map(|kv| (kv.key, kv.value))
            .chain(cli.server.map(|url| ("server.url".to_string(), url))),
    );
    debug!(loaded = ?cfg.loaded_files, "configuration ready");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    runtime.block_on(commands::dispatch(&cfg, cli.command))?;

    info!("done");
    Ok(())
}
