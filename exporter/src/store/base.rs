use std::future::Future;

use tracing::warn;

use crate::error::ExportResult;
use crate::types::{IdBounds, IdentifierConfig, PageRows, ProbeResult};

/// Session against the store that holds the time-correlated identifier and the exported tables.
///
/// A session is a single, mutable, rate-limited resource. Exactly one locate call or
/// pipeline run owns it at a time, which is why every operation takes `&mut self`.
/// Implementations raise on transport failures and never retry.
pub trait IdStore {
    /// Returns the global minimum and maximum of the identifier column.
    ///
    /// Returns `None` when the table is empty.
    fn id_bounds(
        &mut self,
        source: &IdentifierConfig,
    ) -> impl Future<Output = ExportResult<Option<IdBounds>>> + Send;

    /// Returns the first row whose id is greater than or equal to `candidate`.
    ///
    /// Returns `None` when no such row exists. Ids may have gaps, so this is a
    /// ceiling lookup rather than an exact match.
    fn probe(
        &mut self,
        source: &IdentifierConfig,
        candidate: i64,
    ) -> impl Future<Output = ExportResult<Option<ProbeResult>>> + Send;

    /// Runs a page query with `low` and `high` bound as `$1` and `$2`.
    fn fetch_page(
        &mut self,
        query: &str,
        low: i64,
        high: i64,
    ) -> impl Future<Output = ExportResult<PageRows>> + Send;

    /// Releases the session.
    fn close(self) -> impl Future<Output = ExportResult<()>> + Send;
}

/// Runs `work` with exclusive access to `store`, then closes the store.
///
/// The store is closed whether `work` succeeds or fails. A failure of `work`
/// takes precedence over a failure to close, which is only logged in that case.
pub async fn with_store<S, F, T>(mut store: S, work: F) -> ExportResult<T>
where
    S: IdStore,
    F: AsyncFnOnce(&mut S) -> ExportResult<T>,
{
    let result = work(&mut store).await;
    let closed = store.close().await;

    match (result, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(err)) => Err(err),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(close_err)) => {
            warn!(error = %close_err, "failed to close store after an aborted operation");
            Err(err)
        }
    }
}
