use std::fmt;
use std::future::Future;

use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;

use crate::error::ExportResult;

/// Identifies one archive: a table, the dates it covers and an optional part suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArchiveName {
    pub table: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Empty for a whole range, `_part1`/`_part2` for split halves.
    pub suffix: String,
}

impl ArchiveName {
    pub fn new(table: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            table: table.into(),
            start,
            end,
            suffix: String::new(),
        }
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// File stem, `<table>_<start>_to_<end><suffix>`.
    pub fn stem(&self) -> String {
        format!(
            "{}_{}_to_{}{}",
            self.table,
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d"),
            self.suffix
        )
    }
}

impl fmt::Display for ArchiveName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.stem())
    }
}

/// Receives one finished table result per archive.
///
/// A sink is only ever called sequentially by the pipeline.
pub trait Sink {
    /// Persists `batch` under `name`.
    fn write(
        &self,
        name: &ArchiveName,
        batch: RecordBatch,
    ) -> impl Future<Output = ExportResult<()>> + Send;
}
