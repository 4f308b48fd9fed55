use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};
use chrono::NaiveDate;
use exporter::combine::combine_parts;
use exporter::ledger::{read_ledger_window, write_ledger};
use exporter::locator::{locate_day, locate_days};
use exporter::pipeline::{BatchExtractionPipeline, FilterLookup};
use exporter::sink::archive::CsvArchiveSink;
use exporter::store::postgres::PgStore;
use exporter::store::with_store;
use exporter::types::{DailyRange, TableSchema, TimeWindow};
use exporter_config::shared::ExporterConfig;
use tracing::{info, warn};

use crate::cli::Command;

pub async fn run(command: Command, config: ExporterConfig) -> anyhow::Result<()> {
    match command {
        Command::Locate { from, to } => locate(&config, from, to).await,
        Command::Export { date, split } => export_day(&config, date, split).await,
        Command::ExportLedger { from, to, split } => export_ledger(&config, from, to, split).await,
        Command::Combine { table } => combine(&config, table.as_deref()).await,
    }
}

async fn locate(config: &ExporterConfig, from: NaiveDate, to: NaiveDate) -> anyhow::Result<()> {
    let store = PgStore::connect(&config.source).await?;
    let ranges = with_store(store, async |store: &mut PgStore| {
        locate_days(store, &config.identifier, &config.locator, from, to).await
    })
    .await?;

    let unresolved = ranges
        .iter()
        .filter(|daily| !daily.range.is_resolved())
        .count();
    store_ranges(config.export.ledger_path.clone(), ranges).await?;

    info!(%from, %to, unresolved, "recorded located ranges");

    Ok(())
}

async fn export_day(config: &ExporterConfig, date: NaiveDate, split: bool) -> anyhow::Result<()> {
    let pipeline = pipeline(config, split)?;

    let store = PgStore::connect(&config.source).await?;
    let (daily, reports) = with_store(store, async |store: &mut PgStore| {
        let daily = locate_day(store, &config.identifier, &config.locator, date, None).await?;
        let reports = pipeline.run_all(store, &daily.range, daily.window).await?;
        Ok((daily, reports))
    })
    .await?;

    store_ranges(config.export.ledger_path.clone(), vec![daily]).await?;

    let rows = reports.iter().map(|report| report.rows).sum::<usize>();
    info!(%date, tables = reports.len(), rows, "exported day");

    Ok(())
}

async fn export_ledger(
    config: &ExporterConfig,
    from: NaiveDate,
    to: NaiveDate,
    split: bool,
) -> anyhow::Result<()> {
    if from > to {
        bail!("--from {from} is after --to {to}");
    }

    let pipeline = pipeline(config, split)?;
    let window = TimeWindow::new(TimeWindow::day(from).start, TimeWindow::day(to).end);
    let ledger_path = config.export.ledger_path.clone();
    let ranges = tokio::task::spawn_blocking(move || read_ledger_window(&ledger_path, window))
        .await?
        .with_context(|| {
            format!(
                "failed to read range ledger {}",
                config.export.ledger_path.display()
            )
        })?;

    if ranges.is_empty() {
        bail!("range ledger has no days between {from} and {to}, run `locate` first");
    }

    let store = PgStore::connect(&config.source).await?;
    let exported = with_store(store, async |store: &mut PgStore| {
        let mut exported = 0;
        for daily in &ranges {
            if !daily.range.is_resolved() {
                warn!(date = %daily.date, ?daily.range, "skipping day without a located range");
                continue;
            }

            pipeline.run_all(store, &daily.range, daily.window).await?;
            exported += 1;
        }
        Ok(exported)
    })
    .await?;

    info!(%from, %to, days = exported, skipped = ranges.len() - exported, "exported ledger days");

    Ok(())
}

async fn combine(config: &ExporterConfig, only: Option<&str>) -> anyhow::Result<()> {
    let lookup = FilterLookup::build(&config.groups, &config.tables)?;
    let sink = CsvArchiveSink::new(&config.export.output_dir);
    let delay = Duration::from_millis(config.export.combine_delay_ms);

    if let Some(table) = only.filter(|table| config.table(table).is_none()) {
        bail!("table `{table}` is not configured");
    }

    for table in &config.tables {
        if only.is_some_and(|only| only != table.name) {
            continue;
        }
        let Some(filter_column) = lookup.filter_column(&table.name) else {
            continue;
        };

        let schema = TableSchema::from_config(table).output_schema(filter_column);
        let combined = combine_parts(&sink.table_dir(&table.name), &schema, delay).await?;

        info!(table = %table.name, archives = combined.len(), "combined table");
    }

    Ok(())
}

fn pipeline(
    config: &ExporterConfig,
    split: bool,
) -> anyhow::Result<BatchExtractionPipeline<CsvArchiveSink>> {
    let sink = CsvArchiveSink::new(&config.export.output_dir);
    let pipeline = BatchExtractionPipeline::from_config(config, sink)?
        .with_split_in_half(split || config.export.split_in_half);

    Ok(pipeline)
}

async fn store_ranges(path: PathBuf, ranges: Vec<DailyRange>) -> anyhow::Result<()> {
    tokio::task::spawn_blocking(move || {
        write_ledger(&path, &ranges)
            .with_context(|| format!("failed to write range ledger {}", path.display()))
    })
    .await?
}
