use std::borrow::Cow;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray, StringArray, TimestampMicrosecondArray};
use arrow::compute::kernels::boolean::and;
use arrow::compute::kernels::cmp::{gt_eq, lt_eq};
use arrow::compute::filter_record_batch;
use arrow::datatypes::{DataType, Int32Type, TimeUnit};
use arrow::record_batch::RecordBatch;

use crate::bail;
use crate::error::{ErrorKind, ExportResult};
use crate::types::TimeWindow;

/// Keeps the rows whose `column` lies within `window`, both ends inclusive.
///
/// Rows with a null time are dropped.
pub fn filter_time_window(
    batch: &RecordBatch,
    column: &str,
    window: TimeWindow,
) -> ExportResult<RecordBatch> {
    let Ok(index) = batch.schema().index_of(column) else {
        bail!(
            ErrorKind::InvalidData,
            "Filter column is missing from the batch",
            format!("column `{column}` not found")
        );
    };

    let times = batch.column(index);
    if times.data_type() != &DataType::Timestamp(TimeUnit::Microsecond, None) {
        bail!(
            ErrorKind::InvalidData,
            "Filter column is not a timestamp",
            format!("column `{column}` has type {}", times.data_type())
        );
    }

    let start = TimestampMicrosecondArray::new_scalar(window.start.and_utc().timestamp_micros());
    let end = TimestampMicrosecondArray::new_scalar(window.end.and_utc().timestamp_micros());

    let after_start = gt_eq(times, &start)?;
    let before_end = lt_eq(times, &end)?;
    let mask = and(&after_start, &before_end)?;

    Ok(filter_record_batch(batch, &mask)?)
}

/// Removes `column` from the batch if present.
pub fn drop_column(batch: &RecordBatch, column: &str) -> ExportResult<RecordBatch> {
    let schema = batch.schema();
    let keep = (0..schema.fields().len())
        .filter(|index| schema.field(*index).name() != column)
        .collect::<Vec<_>>();

    Ok(batch.project(&keep)?)
}

fn sanitize_text(value: &str) -> Cow<'_, str> {
    if value.contains(['\t', '\n']) {
        Cow::Owned(value.replace(['\t', '\n'], " "))
    } else {
        Cow::Borrowed(value)
    }
}

fn sanitize_strings(array: &StringArray) -> StringArray {
    array
        .iter()
        .map(|value| value.map(sanitize_text))
        .collect()
}

/// Replaces tabs and newlines with a space in plain and categorical string columns.
pub fn sanitize_text_columns(batch: &RecordBatch) -> ExportResult<RecordBatch> {
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(batch.num_columns());

    for column in batch.columns() {
        let sanitized: ArrayRef = match column.data_type() {
            DataType::Utf8 => Arc::new(sanitize_strings(column.as_string::<i32>())),
            DataType::Dictionary(key, value)
                if key.as_ref() == &DataType::Int32 && value.as_ref() == &DataType::Utf8 =>
            {
                let dictionary = column.as_dictionary::<Int32Type>();
                let values = sanitize_strings(dictionary.values().as_string::<i32>());
                Arc::new(dictionary.with_values(Arc::new(values)))
            }
            _ => column.clone(),
        };
        columns.push(sanitized);
    }

    Ok(RecordBatch::try_new(batch.schema(), columns)?)
}

#[cfg(test)]
mod tests {
    use arrow::array::{DictionaryArray, Int64Array};
    use arrow::datatypes::{Field, Schema};
    use chrono::{NaiveDate, NaiveDateTime};

    use super::*;

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn batch() -> RecordBatch {
        let schema = Schema::new(vec![
            Field::new("id", DataType::Int64, true),
            Field::new("note", DataType::Utf8, true),
            Field::new(
                "kind",
                DataType::Dictionary(Box::new(DataType::Int32), Box::new(DataType::Utf8)),
                true,
            ),
            Field::new(
                "logged_at",
                DataType::Timestamp(TimeUnit::Microsecond, None),
                true,
            ),
        ]);

        let kinds: DictionaryArray<Int32Type> =
            vec![Some("a\tb"), None, Some("plain"), Some("c\nd")]
                .into_iter()
                .collect();

        RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(Int64Array::from(vec![1, 2, 3, 4])),
                Arc::new(StringArray::from(vec![
                    Some("line\nbreak"),
                    Some("tab\there"),
                    None,
                    Some("clean"),
                ])),
                Arc::new(kinds),
                Arc::new(TimestampMicrosecondArray::from(vec![
                    Some(at(1).and_utc().timestamp_micros()),
                    Some(at(2).and_utc().timestamp_micros()),
                    None,
                    Some(at(4).and_utc().timestamp_micros()),
                ])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn window_filter_is_inclusive_and_drops_null_times() {
        let filtered = filter_time_window(&batch(), "logged_at", TimeWindow::new(at(2), at(4)))
            .unwrap();

        let ids = filtered.column(0).as_primitive::<arrow::datatypes::Int64Type>();
        assert_eq!(ids.iter().flatten().collect::<Vec<_>>(), vec![2, 4]);
    }

    #[test]
    fn filter_on_non_timestamp_column_fails() {
        let err = filter_time_window(&batch(), "id", TimeWindow::new(at(2), at(4))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }

    #[test]
    fn drop_column_projects_the_rest() {
        let dropped = drop_column(&batch(), "logged_at").unwrap();

        assert_eq!(dropped.num_columns(), 3);
        assert!(dropped.schema().index_of("logged_at").is_err());
    }

    #[test]
    fn tabs_and_newlines_become_spaces() {
        let sanitized = sanitize_text_columns(&batch()).unwrap();

        let notes = sanitized.column(1).as_string::<i32>();
        assert_eq!(notes.value(0), "line break");
        assert_eq!(notes.value(1), "tab here");
        assert!(notes.is_null(2));

        let kinds = sanitized.column(2).as_dictionary::<Int32Type>();
        let values = kinds.values().as_string::<i32>();
        for value in values.iter().flatten() {
            assert!(!value.contains(['\t', '\n']));
        }
        assert_eq!(
            values.value(kinds.keys().value(0) as usize),
            "a b"
        );
    }
}
