use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::NaiveDateTime;
use tokio::sync::Mutex;
use tracing::debug;

use crate::bail;
use crate::error::{ErrorKind, ExportResult};
use crate::store::IdStore;
use crate::types::{IdBounds, IdentifierConfig, PageRows, ProbeResult, TableName, TableRow};

/// Rows served for one page query, keyed by id.
#[derive(Debug, Default)]
struct PageSource {
    columns: Vec<String>,
    rows: BTreeMap<i64, TableRow>,
}

/// Calls observed by a [`MemoryStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreCalls {
    pub bounds: usize,
    /// Candidates in probe order.
    pub probes: Vec<i64>,
    /// Inclusive `(low, high)` bounds in page order.
    pub pages: Vec<(i64, i64)>,
    pub closed: bool,
}

#[derive(Debug, Default)]
struct Inner {
    series: HashMap<TableName, BTreeMap<i64, NaiveDateTime>>,
    page_sources: HashMap<String, PageSource>,
    calls: StoreCalls,
    fail_bounds: bool,
    fail_probe_at: Option<usize>,
    fail_page_at: Option<usize>,
}

/// In-memory store for tests and dry runs.
///
/// Identifier series answer bounds and probe calls, page sources answer page
/// queries by exact query text. Clones share state, so a test can hand one
/// clone to an operation and inspect recorded calls through another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the `(id, logged time)` series searched by the locator.
    pub async fn insert_series<I>(&self, table: TableName, entries: I)
    where
        I: IntoIterator<Item = (i64, NaiveDateTime)>,
    {
        let mut inner = self.inner.lock().await;
        inner.series.entry(table).or_default().extend(entries);
    }

    /// Registers the rows served for `query`. Rows are keyed by their id.
    pub async fn insert_page_source<I>(&self, query: impl Into<String>, columns: Vec<String>, rows: I)
    where
        I: IntoIterator<Item = (i64, TableRow)>,
    {
        let mut inner = self.inner.lock().await;
        let source = inner.page_sources.entry(query.into()).or_default();
        source.columns = columns;
        source.rows.extend(rows);
    }

    /// Makes every bounds call fail as if the store were unreachable.
    pub async fn fail_bounds(&self) {
        self.inner.lock().await.fail_bounds = true;
    }

    /// Makes the probe with the given zero-based index, and every later one, fail.
    pub async fn fail_probes_from(&self, index: usize) {
        self.inner.lock().await.fail_probe_at = Some(index);
    }

    /// Makes the page query with the given zero-based index, and every later one, fail.
    pub async fn fail_pages_from(&self, index: usize) {
        self.inner.lock().await.fail_page_at = Some(index);
    }

    pub async fn calls(&self) -> StoreCalls {
        self.inner.lock().await.calls.clone()
    }
}

impl IdStore for MemoryStore {
    async fn id_bounds(&mut self, source: &IdentifierConfig) -> ExportResult<Option<IdBounds>> {
        let mut inner = self.inner.lock().await;
        inner.calls.bounds += 1;

        if inner.fail_bounds {
            bail!(ErrorKind::StoreUnavailable, "Memory store is unavailable");
        }

        let bounds = inner.series.get(&source.table).and_then(|series| {
            let low = *series.keys().next()?;
            let high = *series.keys().next_back()?;
            Some(IdBounds { low, high })
        });

        Ok(bounds)
    }

    async fn probe(
        &mut self,
        source: &IdentifierConfig,
        candidate: i64,
    ) -> ExportResult<Option<ProbeResult>> {
        let mut inner = self.inner.lock().await;
        let index = inner.calls.probes.len();
        inner.calls.probes.push(candidate);

        if inner.fail_probe_at.is_some_and(|at| index >= at) {
            bail!(
                ErrorKind::StoreUnavailable,
                "Memory store is unavailable",
                format!("probe {index} for candidate {candidate} failed")
            );
        }

        let result = inner.series.get(&source.table).and_then(|series| {
            series
                .range(candidate..)
                .next()
                .map(|(id, logged_at)| ProbeResult::new(*id, *logged_at))
        });

        debug!(candidate, ?result, "memory probe");

        Ok(result)
    }

    async fn fetch_page(&mut self, query: &str, low: i64, high: i64) -> ExportResult<PageRows> {
        let mut inner = self.inner.lock().await;
        let index = inner.calls.pages.len();
        inner.calls.pages.push((low, high));

        if inner.fail_page_at.is_some_and(|at| index >= at) {
            bail!(
                ErrorKind::StoreUnavailable,
                "Memory store is unavailable",
                format!("page {index} for ids {low}..={high} failed")
            );
        }

        let Some(source) = inner.page_sources.get(query) else {
            bail!(
                ErrorKind::StoreQueryFailed,
                "Unknown page query",
                format!("no page source registered for `{query}`")
            );
        };

        if low > high {
            return Ok(PageRows::new(source.columns.clone(), Vec::new()));
        }

        let rows = source
            .rows
            .range(low..=high)
            .map(|(_, row)| row.clone())
            .collect();

        Ok(PageRows::new(source.columns.clone(), rows))
    }

    async fn close(self) -> ExportResult<()> {
        self.inner.lock().await.calls.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::types::Cell;

    fn source() -> IdentifierConfig {
        IdentifierConfig {
            table: TableName::new("public", "events"),
            id_column: "id".to_string(),
            time_column: "logged_at".to_string(),
        }
    }

    fn at(minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(0, minute, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn probe_is_a_ceiling_lookup() {
        let mut store = MemoryStore::new();
        store
            .insert_series(source().table, [(1, at(1)), (5, at(5))])
            .await;

        assert_eq!(
            store.probe(&source(), 2).await.unwrap(),
            Some(ProbeResult::new(5, at(5)))
        );
        assert_eq!(store.probe(&source(), 6).await.unwrap(), None);
        assert_eq!(
            store.id_bounds(&source()).await.unwrap(),
            Some(IdBounds { low: 1, high: 5 })
        );
    }

    #[tokio::test]
    async fn empty_table_has_no_bounds() {
        let mut store = MemoryStore::new();
        assert_eq!(store.id_bounds(&source()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn pages_are_inclusive_and_recorded() {
        let mut store = MemoryStore::new();
        store
            .insert_page_source(
                "q",
                vec!["id".to_string()],
                (1..=10).map(|id| (id, TableRow::new(vec![Cell::I64(id)]))),
            )
            .await;

        let page = store.fetch_page("q", 3, 5).await.unwrap();
        assert_eq!(page.len(), 3);

        store.fail_pages_from(1).await;
        let err = store.fetch_page("q", 6, 8).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StoreUnavailable);
        assert_eq!(store.calls().await.pages, vec![(3, 5), (6, 8)]);
    }
}
