use std::sync::Arc;

use arrow::array::{
    ArrayRef, BooleanBuilder, Float64Builder, Int32Builder, Int64Builder, StringBuilder,
    StringDictionaryBuilder, TimestampMicrosecondBuilder, new_null_array,
};
use arrow::datatypes::Int32Type;
use arrow::record_batch::RecordBatch;
use tracing::debug;

use crate::conversions::cell::{
    cell_to_bool, cell_to_f64, cell_to_i32, cell_to_i64, cell_to_string, cell_to_timestamp,
};
use crate::error::{ErrorKind, ExportError, ExportResult};
use crate::export_error;
use crate::types::{Cell, ColumnConfig, ColumnType, PageRows, TableRow, TableSchema, arrow_type};

/// Resolves which source column feeds a declared column.
///
/// Exact names win; otherwise the first case-insensitive match is used.
fn source_index(columns: &[String], name: &str) -> Option<usize> {
    columns
        .iter()
        .position(|column| column == name)
        .or_else(|| {
            columns
                .iter()
                .position(|column| column.eq_ignore_ascii_case(name))
        })
}

/// Declared columns that the page query does not select.
pub fn missing_columns<'a>(schema: &'a TableSchema, page: &PageRows) -> Vec<&'a str> {
    schema
        .columns()
        .iter()
        .filter(|column| source_index(&page.columns, &column.name).is_none())
        .map(|column| column.name.as_str())
        .collect()
}

/// Converts a page to a record batch with exactly the declared columns.
///
/// Every value is cast to its declared type while building. Declared columns
/// missing from the page become typed null columns.
pub fn page_to_batch(schema: &TableSchema, page: &PageRows) -> ExportResult<RecordBatch> {
    let arrow_schema = schema.arrow_schema();
    if page.is_empty() {
        return Ok(RecordBatch::new_empty(arrow_schema));
    }

    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(schema.columns().len());
    for column in schema.columns() {
        let array = match source_index(&page.columns, &column.name) {
            Some(index) => build_array(&page.rows, index, column)?,
            None => new_null_array(&arrow_type(column.column_type), page.len()),
        };
        arrays.push(array);
    }

    let batch = RecordBatch::try_new(arrow_schema, arrays)?;

    debug!(
        table = schema.name(),
        rows = batch.num_rows(),
        columns = batch.num_columns(),
        "built page batch"
    );

    Ok(batch)
}

static NULL_CELL: Cell = Cell::Null;

fn cell_at(row: &TableRow, index: usize) -> &Cell {
    row.values().get(index).unwrap_or(&NULL_CELL)
}

fn column_error(column: &ColumnConfig, err: ExportError) -> ExportError {
    export_error!(
        ErrorKind::ConversionError,
        "Column value cannot be cast to its declared type",
        format!(
            "column `{}` ({}): {}",
            column.name,
            column.column_type,
            err.detail().unwrap_or(err.description())
        ),
        source: err
    )
}

fn build_array(rows: &[TableRow], index: usize, column: &ColumnConfig) -> ExportResult<ArrayRef> {
    let array = match column.column_type {
        ColumnType::Int32 => build_int32_array(rows, index),
        ColumnType::Int64 => build_int64_array(rows, index),
        ColumnType::Float64 => build_float64_array(rows, index),
        ColumnType::Boolean => build_boolean_array(rows, index),
        ColumnType::String => Ok(build_string_array(rows, index)),
        ColumnType::Timestamp => build_timestamp_array(rows, index),
        ColumnType::Categorical => build_categorical_array(rows, index),
    };

    array.map_err(|err| column_error(column, err))
}

fn build_int32_array(rows: &[TableRow], index: usize) -> ExportResult<ArrayRef> {
    let mut builder = Int32Builder::with_capacity(rows.len());
    for row in rows {
        builder.append_option(cell_to_i32(cell_at(row, index))?);
    }

    Ok(Arc::new(builder.finish()))
}

fn build_int64_array(rows: &[TableRow], index: usize) -> ExportResult<ArrayRef> {
    let mut builder = Int64Builder::with_capacity(rows.len());
    for row in rows {
        builder.append_option(cell_to_i64(cell_at(row, index))?);
    }

    Ok(Arc::new(builder.finish()))
}

fn build_float64_array(rows: &[TableRow], index: usize) -> ExportResult<ArrayRef> {
    let mut builder = Float64Builder::with_capacity(rows.len());
    for row in rows {
        builder.append_option(cell_to_f64(cell_at(row, index))?);
    }

    Ok(Arc::new(builder.finish()))
}

fn build_boolean_array(rows: &[TableRow], index: usize) -> ExportResult<ArrayRef> {
    let mut builder = BooleanBuilder::with_capacity(rows.len());
    for row in rows {
        builder.append_option(cell_to_bool(cell_at(row, index))?);
    }

    Ok(Arc::new(builder.finish()))
}

fn build_string_array(rows: &[TableRow], index: usize) -> ArrayRef {
    let mut builder = StringBuilder::new();
    for row in rows {
        builder.append_option(cell_to_string(cell_at(row, index)));
    }

    Arc::new(builder.finish())
}

/// Timestamps are stored as naive microseconds since the epoch.
fn build_timestamp_array(rows: &[TableRow], index: usize) -> ExportResult<ArrayRef> {
    let mut builder = TimestampMicrosecondBuilder::with_capacity(rows.len());
    for row in rows {
        let value = cell_to_timestamp(cell_at(row, index))?;
        builder.append_option(value.map(|timestamp| timestamp.and_utc().timestamp_micros()));
    }

    Ok(Arc::new(builder.finish()))
}

fn build_categorical_array(rows: &[TableRow], index: usize) -> ExportResult<ArrayRef> {
    let mut builder = StringDictionaryBuilder::<Int32Type>::new();
    for row in rows {
        match cell_to_string(cell_at(row, index)) {
            Some(value) => {
                builder.append(value)?;
            }
            None => builder.append_null(),
        }
    }

    Ok(Arc::new(builder.finish()))
}
