use std::time::Duration;

use chrono::{NaiveDateTime, TimeDelta};
use exporter_config::shared::LocatorConfig;
use tracing::{debug, info};

use crate::error::{ErrorKind, ExportError, ExportResult};
use crate::export_error;
use crate::locator::probe::{fetch_bounds, paced_probe};
use crate::locator::window::{SearchState, SearchTarget, SearchWindow};
use crate::store::IdStore;
use crate::types::{Direction, IdentifierConfig, ProbeResult};

/// Tuning shared by every search of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocatorSettings {
    pub tolerance: TimeDelta,
    pub probe_delay: Duration,
}

impl TryFrom<&LocatorConfig> for LocatorSettings {
    type Error = ExportError;

    fn try_from(config: &LocatorConfig) -> Result<Self, Self::Error> {
        let tolerance = i64::try_from(config.tolerance_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .ok_or_else(|| {
                export_error!(
                    ErrorKind::ConfigError,
                    "Locator tolerance is out of range",
                    format!("{} seconds", config.tolerance_secs)
                )
            })?;

        Ok(Self {
            tolerance,
            probe_delay: Duration::from_millis(config.probe_delay_ms),
        })
    }
}

/// One search: a target time, a side, and an optional seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocateRequest {
    pub target: NaiveDateTime,
    pub direction: Direction,
    pub seed_id: Option<i64>,
    pub seed_step: Option<i64>,
}

impl LocateRequest {
    pub fn new(target: NaiveDateTime, direction: Direction) -> Self {
        Self {
            target,
            direction,
            seed_id: None,
            seed_step: None,
        }
    }

    pub fn seeded(mut self, seed_id: Option<i64>, seed_step: Option<i64>) -> Self {
        self.seed_id = seed_id;
        self.seed_step = seed_step;
        self
    }
}

/// How a search ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocateOutcome {
    /// Close enough on the requested side, or an exact hit.
    Accepted(ProbeResult),
    /// Closest row on the requested side once the window closed.
    Exhausted(ProbeResult),
    /// No row lies on the requested side.
    NoMatch,
}

impl LocateOutcome {
    pub fn result(&self) -> Option<ProbeResult> {
        match self {
            LocateOutcome::Accepted(result) | LocateOutcome::Exhausted(result) => Some(*result),
            LocateOutcome::NoMatch => None,
        }
    }
}

/// Result of [`locate`] along with the number of probes it took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Located {
    pub outcome: LocateOutcome,
    pub iterations: usize,
}

/// Finds the row closest to `request.target` on the requested side.
///
/// Reads the id bounds once, then probes one candidate at a time, pausing
/// `probe_delay` after each probe. An empty table is [`LocateOutcome::NoMatch`].
/// Store failures abort the search and are returned unchanged.
pub async fn locate<S: IdStore>(
    store: &mut S,
    source: &IdentifierConfig,
    settings: &LocatorSettings,
    request: LocateRequest,
) -> ExportResult<Located> {
    let Some(bounds) = fetch_bounds(store, source).await? else {
        info!(table = %source.table, "identifier table is empty, nothing to locate");

        return Ok(Located {
            outcome: LocateOutcome::NoMatch,
            iterations: 0,
        });
    };

    let target = SearchTarget {
        time: request.target,
        direction: request.direction,
        tolerance: settings.tolerance,
    };
    let mut window = SearchWindow::new(bounds, target, request.seed_id, request.seed_step);
    let mut iterations = 0;

    while let Some(candidate) = window.candidate() {
        let probe = paced_probe(store, source, candidate, settings.probe_delay).await?;
        iterations += 1;

        let transition = window.observe(probe);
        debug!(
            iteration = iterations,
            candidate,
            ?probe,
            ?transition,
            low = window.low(),
            high = window.high(),
            step = window.step(),
            "probed candidate"
        );
    }

    let outcome = match window.state() {
        SearchState::Accepted(result) => LocateOutcome::Accepted(result),
        SearchState::Exhausted(result) => LocateOutcome::Exhausted(result),
        SearchState::NoMatch | SearchState::Seeking => LocateOutcome::NoMatch,
    };

    info!(
        target = %request.target,
        direction = %request.direction,
        ?outcome,
        iterations,
        "located identifier"
    );

    Ok(Located {
        outcome,
        iterations,
    })
}
