//! Per-table extraction over a located id range.
//!
//! Tables are grouped by the timestamp column they are filtered on. Every table
//! is paged over the same located id range, filtered on its group's column
//! against the export window, and handed to a [`Sink`].

use std::collections::HashMap;
use std::fmt;

use exporter_config::shared::{ExporterConfig, FilterGroupConfig, TableConfig, ValidationError};
use tracing::{error, info};

use crate::bail;
use crate::error::{ErrorKind, ExportError, ExportResult};
use crate::export_error;
use crate::extract::{ExtractRequest, page};
use crate::sink::{ArchiveName, Sink};
use crate::store::IdStore;
use crate::types::{LocatedRange, TableSchema, TimeWindow};

/// Suffixes of the two halves of a split range.
pub const PART_SUFFIXES: [&str; 2] = ["_part1", "_part2"];

/// Group membership of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterAssignment {
    pub group: String,
    pub filter_column: String,
}

/// Validated table to filter group mapping, built once per run.
#[derive(Debug, Clone, Default)]
pub struct FilterLookup {
    by_table: HashMap<String, FilterAssignment>,
}

impl FilterLookup {
    /// Flattens `groups` into a table lookup.
    ///
    /// Every table must be listed in exactly one group and every listed table must exist.
    pub fn build(
        groups: &[FilterGroupConfig],
        tables: &[TableConfig],
    ) -> Result<Self, ValidationError> {
        let mut by_table: HashMap<String, FilterAssignment> = HashMap::new();

        for group in groups {
            for member in &group.tables {
                if !tables.iter().any(|table| &table.name == member) {
                    return Err(ValidationError::UnknownGroupMember {
                        group: group.name.clone(),
                        table: member.clone(),
                    });
                }

                if let Some(existing) = by_table.get(member) {
                    return Err(ValidationError::TableInManyGroups {
                        table: member.clone(),
                        first: existing.group.clone(),
                        second: group.name.clone(),
                    });
                }

                by_table.insert(
                    member.clone(),
                    FilterAssignment {
                        group: group.name.clone(),
                        filter_column: group.filter_column.clone(),
                    },
                );
            }
        }

        if let Some(table) = tables
            .iter()
            .find(|table| !by_table.contains_key(&table.name))
        {
            return Err(ValidationError::TableWithoutGroup(table.name.clone()));
        }

        Ok(Self { by_table })
    }

    pub fn get(&self, table: &str) -> Option<&FilterAssignment> {
        self.by_table.get(table)
    }

    pub fn filter_column(&self, table: &str) -> Option<&str> {
        self.get(table)
            .map(|assignment| assignment.filter_column.as_str())
    }
}

/// Lifecycle of one table within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TablePhase {
    Pending,
    Fetching,
    TypedAndFiltered,
    Sunk,
    Done,
    Aborted,
}

impl fmt::Display for TablePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self {
            TablePhase::Pending => "pending",
            TablePhase::Fetching => "fetching",
            TablePhase::TypedAndFiltered => "typed_and_filtered",
            TablePhase::Sunk => "sunk",
            TablePhase::Done => "done",
            TablePhase::Aborted => "aborted",
        };
        f.write_str(phase)
    }
}

/// Outcome of one exported table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableReport {
    pub table: String,
    pub parts: usize,
    pub rows: usize,
}

/// Id span processed and sunk on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Part {
    low: i64,
    high: i64,
    suffix: &'static str,
}

/// Splits `[low, high]` into `[low, mid]` and `[mid + 1, high]`, or keeps it whole.
fn parts(low: i64, high: i64, split_in_half: bool) -> Vec<Part> {
    if !split_in_half {
        return vec![Part {
            low,
            high,
            suffix: "",
        }];
    }

    let mid = low + (high - low) / 2;
    vec![
        Part {
            low,
            high: mid,
            suffix: PART_SUFFIXES[0],
        },
        Part {
            low: mid + 1,
            high,
            suffix: PART_SUFFIXES[1],
        },
    ]
}

fn config_error(err: ValidationError) -> ExportError {
    export_error!(
        ErrorKind::ConfigError,
        "Invalid table configuration",
        err.to_string(),
        source: err
    )
}

/// Drives paging, filtering and sinking for a set of tables.
#[derive(Debug)]
pub struct BatchExtractionPipeline<K> {
    tables: Vec<TableConfig>,
    lookup: FilterLookup,
    page_size: i64,
    split_in_half: bool,
    sink: K,
}

impl<K: Sink> BatchExtractionPipeline<K> {
    pub fn new(
        tables: Vec<TableConfig>,
        groups: &[FilterGroupConfig],
        page_size: i64,
        split_in_half: bool,
        sink: K,
    ) -> ExportResult<Self> {
        if page_size <= 0 {
            bail!(
                ErrorKind::ConfigError,
                "Page size must be positive",
                format!("received page size {page_size}")
            );
        }

        let lookup = FilterLookup::build(groups, &tables).map_err(config_error)?;

        Ok(Self {
            tables,
            lookup,
            page_size,
            split_in_half,
            sink,
        })
    }

    /// Builds a pipeline over every configured table.
    pub fn from_config(config: &ExporterConfig, sink: K) -> ExportResult<Self> {
        Self::new(
            config.tables.clone(),
            &config.groups,
            config.export.page_size,
            config.export.split_in_half,
            sink,
        )
    }

    pub fn with_split_in_half(mut self, split_in_half: bool) -> Self {
        self.split_in_half = split_in_half;
        self
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Names of every configured table, in configuration order.
    pub fn table_names(&self) -> Vec<String> {
        self.tables.iter().map(|table| table.name.clone()).collect()
    }

    /// Exports every configured table.
    pub async fn run_all<S: IdStore>(
        &self,
        store: &mut S,
        range: &LocatedRange,
        window: TimeWindow,
    ) -> ExportResult<Vec<TableReport>> {
        let tables = self.table_names();
        self.run(store, &tables, range, window).await
    }

    /// Exports `tables` in order, each over `range` and filtered to `window`.
    ///
    /// The first failure aborts the run and is returned. Tables exported before
    /// the failure keep their archives.
    pub async fn run<S: IdStore>(
        &self,
        store: &mut S,
        tables: &[String],
        range: &LocatedRange,
        window: TimeWindow,
    ) -> ExportResult<Vec<TableReport>> {
        let (low, high) = range.ids()?;
        let mut reports = Vec::with_capacity(tables.len());

        for table in tables {
            info!(table = %table, phase = %TablePhase::Pending, low, high, "queued table");

            match self.export_table(store, table, low, high, window).await {
                Ok(report) => {
                    info!(
                        table = %table,
                        phase = %TablePhase::Done,
                        parts = report.parts,
                        rows = report.rows,
                        "exported table"
                    );
                    reports.push(report);
                }
                Err(err) => {
                    error!(table = %table, phase = %TablePhase::Aborted, error = %err, "table export aborted");
                    return Err(err);
                }
            }
        }

        Ok(reports)
    }

    async fn export_table<S: IdStore>(
        &self,
        store: &mut S,
        table: &str,
        low: i64,
        high: i64,
        window: TimeWindow,
    ) -> ExportResult<TableReport> {
        let Some(config) = self.tables.iter().find(|config| config.name == table) else {
            bail!(
                ErrorKind::ConfigError,
                "Unknown table",
                format!("table `{table}` is not configured")
            );
        };
        let Some(filter_column) = self.lookup.filter_column(table) else {
            return Err(config_error(ValidationError::TableWithoutGroup(
                table.to_string(),
            )));
        };

        let schema = TableSchema::from_config(config);
        let mut rows = 0;
        let parts = parts(low, high, self.split_in_half);

        for part in &parts {
            info!(
                table,
                phase = %TablePhase::Fetching,
                low = part.low,
                high = part.high,
                suffix = part.suffix,
                "fetching table"
            );

            let request = ExtractRequest {
                schema: &schema,
                query: &config.query,
                low: part.low,
                high: part.high,
                page_size: self.page_size,
                filter_column,
                window,
            };

            let batch = page(store, &request).await?;

            info!(
                table,
                phase = %TablePhase::TypedAndFiltered,
                rows = batch.num_rows(),
                "filtered table"
            );

            rows += batch.num_rows();
            let name = ArchiveName::new(table, window.start.date(), window.end.date())
                .with_suffix(part.suffix);
            self.sink.write(&name, batch).await?;

            info!(table, phase = %TablePhase::Sunk, archive = %name, "sunk table");
        }

        Ok(TableReport {
            table: table.to_string(),
            parts: parts.len(),
            rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use exporter_config::shared::{ColumnConfig, ColumnType};

    use super::*;

    fn table(name: &str) -> TableConfig {
        TableConfig {
            name: name.to_string(),
            query: format!("select * from {name} where id between $1 and $2"),
            columns: vec![ColumnConfig {
                name: "logged_at".to_string(),
                column_type: ColumnType::Timestamp,
                accessory: false,
            }],
        }
    }

    fn group(name: &str, tables: &[&str]) -> FilterGroupConfig {
        FilterGroupConfig {
            name: name.to_string(),
            filter_column: "logged_at".to_string(),
            tables: tables.iter().map(|table| table.to_string()).collect(),
        }
    }

    #[test]
    fn lookup_resolves_filter_columns() {
        let lookup = FilterLookup::build(
            &[group("visits", &["visit", "visit_item"])],
            &[table("visit"), table("visit_item")],
        )
        .unwrap();

        assert_eq!(lookup.filter_column("visit_item"), Some("logged_at"));
        assert_eq!(lookup.get("visit").unwrap().group, "visits");
        assert_eq!(lookup.filter_column("other"), None);
    }

    #[test]
    fn lookup_rejects_table_in_two_groups() {
        let err = FilterLookup::build(
            &[group("a", &["visit"]), group("b", &["visit"])],
            &[table("visit")],
        )
        .unwrap_err();

        assert_eq!(
            err,
            ValidationError::TableInManyGroups {
                table: "visit".to_string(),
                first: "a".to_string(),
                second: "b".to_string(),
            }
        );
    }

    #[test]
    fn lookup_rejects_table_without_group() {
        let err = FilterLookup::build(&[group("a", &["visit"])], &[table("visit"), table("item")])
            .unwrap_err();

        assert_eq!(err, ValidationError::TableWithoutGroup("item".to_string()));
    }

    #[test]
    fn split_halves_cover_the_range_once() {
        assert_eq!(
            parts(1, 10, true),
            vec![
                Part {
                    low: 1,
                    high: 5,
                    suffix: "_part1"
                },
                Part {
                    low: 6,
                    high: 10,
                    suffix: "_part2"
                },
            ]
        );
        assert_eq!(parts(4, 4, true)[1].low, 5);
        assert_eq!(parts(1, 10, false).len(), 1);
    }

    #[test]
    fn phases_render_in_snake_case() {
        assert_eq!(TablePhase::TypedAndFiltered.to_string(), "typed_and_filtered");
    }
}
