use std::time::Duration;

use tracing::debug;

use crate::error::ExportResult;
use crate::store::IdStore;
use crate::types::{IdBounds, IdentifierConfig, ProbeResult};

/// Reads the global id bounds once per search.
pub async fn fetch_bounds<S: IdStore>(
    store: &mut S,
    source: &IdentifierConfig,
) -> ExportResult<Option<IdBounds>> {
    let bounds = store.id_bounds(source).await?;
    debug!(table = %source.table, ?bounds, "fetched id bounds");

    Ok(bounds)
}

/// Probes `candidate`, then waits `delay` before the next store call.
///
/// The wait is a throttle towards the store, not a retry. A failed probe returns
/// immediately without waiting.
pub async fn paced_probe<S: IdStore>(
    store: &mut S,
    source: &IdentifierConfig,
    candidate: i64,
    delay: Duration,
) -> ExportResult<Option<ProbeResult>> {
    let result = store.probe(source, candidate).await?;

    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    Ok(result)
}
