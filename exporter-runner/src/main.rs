//! Exporter binary.
//!
//! Locates the id range of each day, persists it to the range ledger, exports the
//! configured tables into dated `.csv.gz` archives and combines split archives.

use anyhow::Context;
use clap::Parser;
use exporter_telemetry::tracing::init_tracing;
use tracing::error;

use crate::cli::Args;
use crate::config::load_exporter_config;

mod cli;
mod commands;
mod config;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = load_exporter_config()?;

    let _log_flusher =
        init_tracing(env!("CARGO_BIN_NAME")).context("failed to initialize tracing")?;

    let result = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(commands::run(args.command, config));

    if let Err(err) = &result {
        error!(error = %err, "exporter failed");
    }

    result
}
