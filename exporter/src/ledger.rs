//! Persisted day ranges, so exports can run without locating again.
//!
//! The ledger is a comma separated CSV with a header and one row per day:
//! `date,start,end,logged_start_id,logged_start_datetime,logged_end_id,logged_end_datetime`.
//! Located ids and times are empty when their search found no match.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, LazyLock};

use arrow::array::{
    Array, ArrayRef, AsArray, Date32Array, Int64Array, TimestampMicrosecondArray,
};
use arrow::csv::{ReaderBuilder, WriterBuilder};
use arrow::datatypes::{
    DataType, Date32Type, Field, Int64Type, Schema, SchemaRef, TimeUnit, TimestampMicrosecondType,
};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta};
use tracing::info;

use crate::conversions::timestamp::TIMESTAMP_FORMAT;
use crate::error::{ErrorKind, ExportResult};
use crate::export_error;
use crate::types::{DailyRange, LocatedRange, ProbeResult, TimeWindow};

const DATE: &str = "date";
const START: &str = "start";
const END: &str = "end";
const START_ID: &str = "logged_start_id";
const START_LOGGED_AT: &str = "logged_start_datetime";
const END_ID: &str = "logged_end_id";
const END_LOGGED_AT: &str = "logged_end_datetime";

static LEDGER_SCHEMA: LazyLock<SchemaRef> = LazyLock::new(|| {
    let timestamp = DataType::Timestamp(TimeUnit::Microsecond, None);

    Arc::new(Schema::new(vec![
        Field::new(DATE, DataType::Date32, false),
        Field::new(START, timestamp.clone(), false),
        Field::new(END, timestamp.clone(), false),
        Field::new(START_ID, DataType::Int64, true),
        Field::new(START_LOGGED_AT, timestamp.clone(), true),
        Field::new(END_ID, DataType::Int64, true),
        Field::new(END_LOGGED_AT, timestamp, true),
    ]))
});

/// Schema of the ledger file.
pub fn ledger_schema() -> SchemaRef {
    LEDGER_SCHEMA.clone()
}

fn epoch() -> NaiveDate {
    NaiveDate::default()
}

fn to_date32(date: NaiveDate) -> i32 {
    (date - epoch()).num_days() as i32
}

fn from_date32(days: i32) -> NaiveDate {
    epoch() + TimeDelta::days(i64::from(days))
}

fn to_micros(time: NaiveDateTime) -> i64 {
    time.and_utc().timestamp_micros()
}

fn from_micros(micros: i64) -> ExportResult<NaiveDateTime> {
    DateTime::from_timestamp_micros(micros)
        .map(|time| time.naive_utc())
        .ok_or_else(|| {
            export_error!(
                ErrorKind::InvalidData,
                "Ledger timestamp is out of range",
                format!("{micros} microseconds")
            )
        })
}

fn to_batch(ranges: &[DailyRange]) -> ExportResult<RecordBatch> {
    let dates = Date32Array::from_iter_values(ranges.iter().map(|daily| to_date32(daily.date)));
    let starts = TimestampMicrosecondArray::from_iter_values(
        ranges.iter().map(|daily| to_micros(daily.window.start)),
    );
    let ends = TimestampMicrosecondArray::from_iter_values(
        ranges.iter().map(|daily| to_micros(daily.window.end)),
    );
    let start_ids: Int64Array = ranges
        .iter()
        .map(|daily| daily.range.start.map(|start| start.id))
        .collect();
    let start_times: TimestampMicrosecondArray = ranges
        .iter()
        .map(|daily| daily.range.start.map(|start| to_micros(start.logged_at)))
        .collect();
    let end_ids: Int64Array = ranges
        .iter()
        .map(|daily| daily.range.end.map(|end| end.id))
        .collect();
    let end_times: TimestampMicrosecondArray = ranges
        .iter()
        .map(|daily| daily.range.end.map(|end| to_micros(end.logged_at)))
        .collect();

    let columns: Vec<ArrayRef> = vec![
        Arc::new(dates),
        Arc::new(starts),
        Arc::new(ends),
        Arc::new(start_ids),
        Arc::new(start_times),
        Arc::new(end_ids),
        Arc::new(end_times),
    ];

    Ok(RecordBatch::try_new(ledger_schema(), columns)?)
}

fn side(id: Option<i64>, logged_at: Option<i64>) -> ExportResult<Option<ProbeResult>> {
    match (id, logged_at) {
        (Some(id), Some(micros)) => Ok(Some(ProbeResult::new(id, from_micros(micros)?))),
        _ => Ok(None),
    }
}

fn from_batch(batch: &RecordBatch) -> ExportResult<Vec<DailyRange>> {
    let dates = batch.column(0).as_primitive::<Date32Type>();
    let starts = batch.column(1).as_primitive::<TimestampMicrosecondType>();
    let ends = batch.column(2).as_primitive::<TimestampMicrosecondType>();
    let start_ids = batch.column(3).as_primitive::<Int64Type>();
    let start_times = batch.column(4).as_primitive::<TimestampMicrosecondType>();
    let end_ids = batch.column(5).as_primitive::<Int64Type>();
    let end_times = batch.column(6).as_primitive::<TimestampMicrosecondType>();

    let value = |array: &arrow::array::PrimitiveArray<Int64Type>, row: usize| {
        (!array.is_null(row)).then(|| array.value(row))
    };
    let time = |array: &TimestampMicrosecondArray, row: usize| {
        (!array.is_null(row)).then(|| array.value(row))
    };

    (0..batch.num_rows())
        .map(|row| {
            let range = LocatedRange::new(
                side(value(start_ids, row), time(start_times, row))?,
                side(value(end_ids, row), time(end_times, row))?,
            );

            Ok(DailyRange {
                date: from_date32(dates.value(row)),
                window: TimeWindow::new(from_micros(starts.value(row))?, from_micros(ends.value(row))?),
                range,
            })
        })
        .collect()
}

/// Reads every range of the ledger at `path`, ordered by start. Blocking.
pub fn read_ledger(path: &Path) -> ExportResult<Vec<DailyRange>> {
    let file = BufReader::new(File::open(path)?);
    let reader = ReaderBuilder::new(ledger_schema())
        .with_header(true)
        .build(file)?;

    let mut ranges = Vec::new();
    for batch in reader {
        ranges.extend(from_batch(&batch?)?);
    }
    ranges.sort_by_key(|daily| daily.window.start);

    Ok(ranges)
}

/// Reads the ranges whose start falls within `window`, ordered by start. Blocking.
pub fn read_ledger_window(path: &Path, window: TimeWindow) -> ExportResult<Vec<DailyRange>> {
    let ranges = read_ledger(path)?
        .into_iter()
        .filter(|daily| window.contains(daily.window.start))
        .collect();

    Ok(ranges)
}

/// Writes `ranges` to the ledger, replacing rows of the same date. Blocking.
///
/// Rows already in the ledger for other dates are kept.
pub fn write_ledger(path: &Path, ranges: &[DailyRange]) -> ExportResult<()> {
    let mut by_date = BTreeMap::new();
    if path.is_file() {
        for daily in read_ledger(path)? {
            by_date.insert(daily.date, daily);
        }
    }
    for daily in ranges {
        by_date.insert(daily.date, *daily);
    }

    let mut merged = by_date.into_values().collect::<Vec<_>>();
    merged.sort_by_key(|daily| daily.window.start);

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let batch = to_batch(&merged)?;
    let mut file = BufWriter::new(File::create(path)?);
    {
        let mut writer = WriterBuilder::new()
            .with_header(true)
            .with_timestamp_format(TIMESTAMP_FORMAT.to_string())
            .build(&mut file);
        writer.write(&batch)?;
    }
    file.flush()?;

    info!(path = %path.display(), rows = merged.len(), "wrote range ledger");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, day).unwrap()
    }

    fn daily(date: NaiveDate, start_id: Option<i64>, end_id: i64) -> DailyRange {
        let window = TimeWindow::day(date);

        DailyRange {
            date,
            window,
            range: LocatedRange::new(
                start_id.map(|id| ProbeResult::new(id, window.start - TimeDelta::minutes(61))),
                Some(ProbeResult::new(end_id, window.end + TimeDelta::minutes(62))),
            ),
        }
    }

    #[test]
    fn ledger_keeps_unresolved_sides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ranges.csv");
        let ranges = vec![daily(day(2), Some(10), 20), daily(day(1), None, 9)];

        write_ledger(&path, &ranges).unwrap();
        let read = read_ledger(&path).unwrap();

        assert_eq!(read, vec![ranges[1], ranges[0]]);
        assert!(read[0].range.start.is_none());
    }

    #[test]
    fn window_filter_uses_the_start() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ranges.csv");
        write_ledger(
            &path,
            &[daily(day(1), Some(1), 9), daily(day(2), Some(10), 20), daily(day(3), Some(21), 30)],
        )
        .unwrap();

        let window = TimeWindow::new(TimeWindow::day(day(2)).start, TimeWindow::day(day(3)).end);
        let read = read_ledger_window(&path, window).unwrap();

        assert_eq!(read.iter().map(|daily| daily.date).collect::<Vec<_>>(), vec![day(2), day(3)]);
    }

    #[test]
    fn rewriting_a_date_replaces_its_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ranges.csv");

        write_ledger(&path, &[daily(day(1), None, 9), daily(day(2), Some(10), 20)]).unwrap();
        write_ledger(&path, &[daily(day(1), Some(3), 9)]).unwrap();

        let read = read_ledger(&path).unwrap();
        assert_eq!(read.len(), 2);
        assert_eq!(read[0].range.start.map(|start| start.id), Some(3));
    }

    #[test]
    fn header_uses_ledger_column_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ranges.csv");

        write_ledger(&path, &[daily(day(1), Some(1), 9)]).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(
            text.lines().next().unwrap(),
            "date,start,end,logged_start_id,logged_start_datetime,logged_end_id,logged_end_datetime"
        );
        assert!(text.contains("2025-01-01,2025-01-01 00:00:00,2025-01-01 23:59:59.999999"));
    }
}
