use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use exporter_config::shared::{ColumnConfig, ColumnType, TableConfig};

/// Returns the arrow type a declared column is stored as.
pub fn arrow_type(column_type: ColumnType) -> DataType {
    match column_type {
        ColumnType::Int32 => DataType::Int32,
        ColumnType::Int64 => DataType::Int64,
        ColumnType::Float64 => DataType::Float64,
        ColumnType::Boolean => DataType::Boolean,
        ColumnType::String => DataType::Utf8,
        ColumnType::Timestamp => DataType::Timestamp(TimeUnit::Microsecond, None),
        ColumnType::Categorical => {
            DataType::Dictionary(Box::new(DataType::Int32), Box::new(DataType::Utf8))
        }
    }
}

/// The fixed, fully declared column layout of one exported table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    name: String,
    columns: Vec<ColumnConfig>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnConfig>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    pub fn from_config(table: &TableConfig) -> Self {
        Self::new(table.name.clone(), table.columns.clone())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[ColumnConfig] {
        &self.columns
    }

    /// Returns the index of the declared column with the given name.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name == name)
    }

    /// Builds the arrow schema. Every column is nullable.
    pub fn arrow_schema(&self) -> SchemaRef {
        let fields = self
            .columns
            .iter()
            .map(|column| Field::new(&column.name, arrow_type(column.column_type), true))
            .collect::<Vec<_>>();

        Arc::new(Schema::new(fields))
    }

    /// Returns true when `filter_column` was only appended to filter on.
    ///
    /// That is the case when it is the last declared column and flagged as accessory.
    pub fn drops_filter_column(&self, filter_column: &str) -> bool {
        self.columns
            .last()
            .is_some_and(|column| column.name == filter_column && column.accessory)
    }

    /// Returns the schema rows have once they reach a sink.
    pub fn output_schema(&self, filter_column: &str) -> TableSchema {
        let mut columns = self.columns.clone();
        if self.drops_filter_column(filter_column) {
            columns.pop();
        }

        TableSchema::new(self.name.clone(), columns)
    }
}
