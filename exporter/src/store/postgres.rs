use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use exporter_config::shared::PgConnectionConfig;
use exporter_postgres::queries::{id_bounds_query, probe_query};
use sqlx::postgres::{PgConnection, PgRow};
use sqlx::types::{BigDecimal, Uuid};
use sqlx::{Column, Connection, Row, TypeInfo};
use tracing::{debug, info, warn};

use crate::bail;
use crate::error::{ErrorKind, ExportResult};
use crate::store::IdStore;
use crate::types::{Cell, IdBounds, IdentifierConfig, PageRows, ProbeResult, TableRow};

/// A single Postgres session.
///
/// Opened once per unit of work and released through [`IdStore::close`].
#[derive(Debug)]
pub struct PgStore {
    connection: PgConnection,
}

impl PgStore {
    pub async fn connect(config: &PgConnectionConfig) -> ExportResult<Self> {
        let options = config.connect_options();
        let connection = PgConnection::connect_with(&options).await?;

        info!(host = %config.host, database = %config.name, "opened store session");

        Ok(Self { connection })
    }
}

impl IdStore for PgStore {
    async fn id_bounds(&mut self, source: &IdentifierConfig) -> ExportResult<Option<IdBounds>> {
        let query = id_bounds_query(&source.table, &source.id_column);
        let (low, high): (Option<i64>, Option<i64>) = sqlx::query_as(&query)
            .fetch_one(&mut self.connection)
            .await?;

        Ok(low.zip(high).map(|(low, high)| IdBounds { low, high }))
    }

    async fn probe(
        &mut self,
        source: &IdentifierConfig,
        candidate: i64,
    ) -> ExportResult<Option<ProbeResult>> {
        let query = probe_query(&source.table, &source.id_column, &source.time_column);
        let row: Option<(i64, Option<NaiveDateTime>)> = sqlx::query_as(&query)
            .bind(candidate)
            .fetch_optional(&mut self.connection)
            .await?;

        match row {
            None => Ok(None),
            Some((id, Some(logged_at))) => Ok(Some(ProbeResult::new(id, logged_at))),
            Some((id, None)) => bail!(
                ErrorKind::InvalidData,
                "Probed row has no timestamp",
                format!("row {id} of {} has a null {}", source.table, source.time_column)
            ),
        }
    }

    async fn fetch_page(&mut self, query: &str, low: i64, high: i64) -> ExportResult<PageRows> {
        let rows = sqlx::query(query)
            .bind(low)
            .bind(high)
            .fetch_all(&mut self.connection)
            .await?;

        let columns = rows
            .first()
            .map(|row| {
                row.columns()
                    .iter()
                    .map(|column| column.name().to_string())
                    .collect()
            })
            .unwrap_or_default();

        let rows = rows.iter().map(decode_row).collect::<ExportResult<Vec<_>>>()?;

        debug!(low, high, rows = rows.len(), "fetched page");

        Ok(PageRows::new(columns, rows))
    }

    async fn close(self) -> ExportResult<()> {
        self.connection.close().await?;
        info!("closed store session");

        Ok(())
    }
}

fn decode_row(row: &PgRow) -> ExportResult<TableRow> {
    let values = (0..row.columns().len())
        .map(|index| decode_cell(row, index))
        .collect::<ExportResult<Vec<_>>>()?;

    Ok(TableRow::new(values))
}

/// Decodes one column by its Postgres type name.
///
/// Unknown types are read as text when the driver allows it and become null otherwise.
fn decode_cell(row: &PgRow, index: usize) -> ExportResult<Cell> {
    let column = &row.columns()[index];
    let type_name = column.type_info().name();

    let cell: Cell = match type_name {
        "INT2" => row.try_get::<Option<i16>, _>(index)?.map_or(Cell::Null, Cell::I16),
        "INT4" => row.try_get::<Option<i32>, _>(index)?.into(),
        "INT8" => row.try_get::<Option<i64>, _>(index)?.into(),
        "FLOAT4" => row.try_get::<Option<f32>, _>(index)?.map_or(Cell::Null, Cell::F32),
        "FLOAT8" => row.try_get::<Option<f64>, _>(index)?.into(),
        "NUMERIC" => row
            .try_get::<Option<BigDecimal>, _>(index)?
            .map_or(Cell::Null, |value| Cell::Numeric(value.to_string())),
        "BOOL" => row.try_get::<Option<bool>, _>(index)?.into(),
        "TEXT" | "VARCHAR" | "BPCHAR" | "CHAR" | "NAME" => {
            row.try_get::<Option<String>, _>(index)?.into()
        }
        "TIMESTAMP" => row.try_get::<Option<NaiveDateTime>, _>(index)?.into(),
        "TIMESTAMPTZ" => row
            .try_get::<Option<DateTime<Utc>>, _>(index)?
            .map(|value| value.naive_utc())
            .into(),
        "DATE" => row.try_get::<Option<NaiveDate>, _>(index)?.into(),
        "UUID" => row
            .try_get::<Option<Uuid>, _>(index)?
            .map(|value| value.to_string())
            .into(),
        other => match row.try_get::<Option<String>, _>(index) {
            Ok(value) => value.into(),
            Err(err) => {
                warn!(
                    column = column.name(),
                    type_name = other,
                    error = %err,
                    "unsupported column type, reading as null"
                );
                Cell::Null
            }
        },
    };

    Ok(cell)
}
