use chrono::{NaiveDate, TimeDelta};
use exporter_config::shared::LocatorConfig;
use tracing::{info, warn};

use crate::{bail, export_error};
use crate::error::{ErrorKind, ExportResult};
use crate::locator::locate::{LocateRequest, LocatorSettings, locate};
use crate::store::IdStore;
use crate::types::{DailyRange, Direction, IdentifierConfig, LocatedRange, TimeWindow};

/// Locates the rows bounding `window` widened by `margin`.
///
/// The start is searched `before` the widened start, the end `after` the widened
/// end. The start search is seeded with `seed_id`; the end search is seeded with
/// the located start. `seed_step` only applies to seeded searches.
pub async fn locate_window<S: IdStore>(
    store: &mut S,
    source: &IdentifierConfig,
    settings: &LocatorSettings,
    window: TimeWindow,
    margin: TimeDelta,
    seed_id: Option<i64>,
    seed_step: i64,
) -> ExportResult<LocatedRange> {
    let widened = window.widen(margin);

    let start = locate(
        store,
        source,
        settings,
        LocateRequest::new(widened.start, Direction::Before)
            .seeded(seed_id, seed_id.map(|_| seed_step)),
    )
    .await?
    .outcome
    .result();

    let end_seed = start.map(|result| result.id);
    let end = locate(
        store,
        source,
        settings,
        LocateRequest::new(widened.end, Direction::After)
            .seeded(end_seed, end_seed.map(|_| seed_step)),
    )
    .await?
    .outcome
    .result();

    Ok(LocatedRange::new(start, end))
}

/// Configured margin around each day.
pub fn day_margin(config: &LocatorConfig) -> ExportResult<TimeDelta> {
    i64::try_from(config.margin_mins)
        .ok()
        .and_then(TimeDelta::try_minutes)
        .ok_or_else(|| {
            export_error!(
                ErrorKind::ConfigError,
                "Locator margin is out of range",
                format!("{} minutes", config.margin_mins)
            )
        })
}

/// Locates the range of one day, with the configured margin around it.
pub async fn locate_day<S: IdStore>(
    store: &mut S,
    source: &IdentifierConfig,
    config: &LocatorConfig,
    date: NaiveDate,
    seed_id: Option<i64>,
) -> ExportResult<DailyRange> {
    let window = TimeWindow::day(date);
    let range = locate_window(
        store,
        source,
        &LocatorSettings::try_from(config)?,
        window,
        day_margin(config)?,
        seed_id,
        config.seed_step,
    )
    .await?;

    if !range.is_resolved() {
        warn!(%date, ?range, "day range is only partially located");
    }

    Ok(DailyRange {
        date,
        window,
        range,
    })
}

/// Locates every day from `from` to `to`, both inclusive, in order.
///
/// Each search is seeded with the id located by the previous one.
pub async fn locate_days<S: IdStore>(
    store: &mut S,
    source: &IdentifierConfig,
    config: &LocatorConfig,
    from: NaiveDate,
    to: NaiveDate,
) -> ExportResult<Vec<DailyRange>> {
    if from > to {
        bail!(
            ErrorKind::InvalidData,
            "Date range is reversed",
            format!("{from} is after {to}")
        );
    }

    let mut ranges = Vec::new();
    let mut seed_id = None;

    for date in from.iter_days().take_while(|date| *date <= to) {
        let daily = locate_day(store, source, config, date, seed_id).await?;
        info!(
            %date,
            start_id = daily.range.start.map(|start| start.id),
            end_id = daily.range.end.map(|end| end.id),
            "located day"
        );

        seed_id = daily.range.end.map(|end| end.id);
        ranges.push(daily);
    }

    Ok(ranges)
}
