use arrow::compute::concat_batches;
use arrow::record_batch::RecordBatch;
use tracing::{debug, info, warn};

use crate::bail;
use crate::error::{ErrorKind, ExportResult};
use crate::extract::batch::{missing_columns, page_to_batch};
use crate::extract::transform::{drop_column, filter_time_window, sanitize_text_columns};
use crate::store::IdStore;
use crate::types::{TableSchema, TimeWindow};

/// Everything needed to extract one table over one id range.
#[derive(Debug, Clone, Copy)]
pub struct ExtractRequest<'a> {
    pub schema: &'a TableSchema,
    /// Page query binding the inclusive page bounds as `$1` and `$2`.
    pub query: &'a str,
    pub low: i64,
    pub high: i64,
    pub page_size: i64,
    /// Timestamp column the pages are filtered on.
    pub filter_column: &'a str,
    pub window: TimeWindow,
}

/// Pages through `[low, high]` and concatenates the typed pages.
///
/// Each page covers `page_size` ids, `[cursor, min(cursor + page_size - 1, high)]`.
/// Empty pages are skipped and paging continues until the page reaching `high`.
/// The result always carries every declared column, even when no rows came back.
pub async fn fetch_pages<S: IdStore>(
    store: &mut S,
    schema: &TableSchema,
    query: &str,
    low: i64,
    high: i64,
    page_size: i64,
) -> ExportResult<RecordBatch> {
    if page_size <= 0 {
        bail!(
            ErrorKind::InvalidData,
            "Page size must be positive",
            format!("received page size {page_size}")
        );
    }

    let mut batches = Vec::new();
    let mut checked_columns = false;
    let mut pages = 0usize;
    let mut cursor = low;

    while cursor <= high {
        let end = cursor.saturating_add(page_size - 1).min(high);
        let rows = store.fetch_page(query, cursor, end).await?;
        pages += 1;

        debug!(table = schema.name(), low = cursor, high = end, rows = rows.len(), "fetched page");

        if !rows.is_empty() {
            if !checked_columns {
                let missing = missing_columns(schema, &rows);
                if !missing.is_empty() {
                    warn!(
                        table = schema.name(),
                        columns = ?missing,
                        "page query does not select every declared column, filling with nulls"
                    );
                }
                checked_columns = true;
            }

            batches.push(page_to_batch(schema, &rows)?);
        }

        if end >= high {
            break;
        }
        cursor = end + 1;
    }

    let batch = concat_batches(&schema.arrow_schema(), &batches)?;

    info!(
        table = schema.name(),
        low,
        high,
        pages,
        rows = batch.num_rows(),
        "paged table"
    );

    Ok(batch)
}

/// Filters a paged batch on the request window, drops an accessory filter
/// column and sanitizes text.
fn finish_batch(batch: &RecordBatch, request: &ExtractRequest<'_>) -> ExportResult<RecordBatch> {
    let mut batch = filter_time_window(batch, request.filter_column, request.window)?;

    if request.schema.drops_filter_column(request.filter_column) {
        batch = drop_column(&batch, request.filter_column)?;
    }

    sanitize_text_columns(&batch)
}

/// Pages, types, filters and sanitizes one table.
pub async fn page<S: IdStore>(store: &mut S, request: &ExtractRequest<'_>) -> ExportResult<RecordBatch> {
    let paged = fetch_pages(
        store,
        request.schema,
        request.query,
        request.low,
        request.high,
        request.page_size,
    )
    .await?;

    finish_batch(&paged, request)
}

#[cfg(test)]
mod tests {
    use arrow::array::AsArray;
    use arrow::datatypes::Int64Type;
    use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

    use super::*;
    use crate::store::memory::MemoryStore;
    use crate::types::{Cell, ColumnConfig, ColumnType, TableRow};

    const QUERY: &str = "select id, logged_at from visit where id between $1 and $2";

    fn base() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn schema(accessory: bool) -> TableSchema {
        TableSchema::new(
            "visit",
            vec![
                ColumnConfig {
                    name: "id".to_string(),
                    column_type: ColumnType::Int64,
                    accessory: false,
                },
                ColumnConfig {
                    name: "logged_at".to_string(),
                    column_type: ColumnType::Timestamp,
                    accessory,
                },
            ],
        )
    }

    async fn store(ids: impl IntoIterator<Item = i64>) -> MemoryStore {
        let store = MemoryStore::new();
        store
            .insert_page_source(
                QUERY,
                vec!["id".to_string(), "logged_at".to_string()],
                ids.into_iter().map(|id| {
                    (
                        id,
                        TableRow::new(vec![
                            Cell::I64(id),
                            Cell::Timestamp(base() + TimeDelta::minutes(id)),
                        ]),
                    )
                }),
            )
            .await;
        store
    }

    #[tokio::test]
    async fn pages_are_inclusive_and_do_not_skip_the_last_id() {
        let mut store = store(1..=10).await;

        let batch = fetch_pages(&mut store, &schema(false), QUERY, 1, 10, 3)
            .await
            .unwrap();

        assert_eq!(batch.num_rows(), 10);
        assert_eq!(
            store.calls().await.pages,
            vec![(1, 3), (4, 6), (7, 9), (10, 10)]
        );
    }

    #[tokio::test]
    async fn empty_pages_do_not_stop_paging() {
        let mut store = store([1, 2, 9, 10]).await;

        let batch = fetch_pages(&mut store, &schema(false), QUERY, 1, 10, 2)
            .await
            .unwrap();

        let ids = batch.column(0).as_primitive::<Int64Type>();
        assert_eq!(ids.values().to_vec(), vec![1, 2, 9, 10]);
        assert_eq!(store.calls().await.pages.len(), 5);
    }

    #[tokio::test]
    async fn no_rows_yield_a_typed_empty_batch() {
        let mut store = store([]).await;

        let batch = fetch_pages(&mut store, &schema(false), QUERY, 1, 10, 4)
            .await
            .unwrap();

        assert_eq!(batch.num_rows(), 0);
        assert_eq!(batch.schema(), schema(false).arrow_schema());
    }

    #[tokio::test]
    async fn reversed_range_issues_no_query() {
        let mut store = store(1..=10).await;

        let batch = fetch_pages(&mut store, &schema(false), QUERY, 5, 4, 4)
            .await
            .unwrap();

        assert_eq!(batch.num_rows(), 0);
        assert!(store.calls().await.pages.is_empty());
    }

    #[tokio::test]
    async fn non_positive_page_size_is_rejected() {
        let mut store = store(1..=10).await;

        let err = fetch_pages(&mut store, &schema(false), QUERY, 1, 10, 0)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn page_filters_and_drops_accessory_column() {
        let mut store = store(1..=100).await;
        let schema = schema(true);
        let request = ExtractRequest {
            schema: &schema,
            query: QUERY,
            low: 1,
            high: 100,
            page_size: 30,
            filter_column: "logged_at",
            window: TimeWindow::new(
                base() + TimeDelta::minutes(20),
                base() + TimeDelta::minutes(40),
            ),
        };

        let batch = page(&mut store, &request).await.unwrap();

        assert_eq!(batch.num_columns(), 1);
        assert_eq!(batch.num_rows(), 21);
    }

    #[tokio::test]
    async fn page_failure_propagates() {
        let mut store = store(1..=10).await;
        store.fail_pages_from(1).await;

        let err = fetch_pages(&mut store, &schema(false), QUERY, 1, 10, 3)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::StoreUnavailable);
    }
}
