use crate::types::Cell;

/// Represents a complete row returned by a page query.
///
/// Values are ordered like the columns of the [`PageRows`] that carries the row.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    values: Vec<Cell>,
}

impl TableRow {
    /// Creates a new row with the given cell values.
    pub fn new(values: Vec<Cell>) -> Self {
        Self { values }
    }

    /// Returns the row values in column order.
    pub fn values(&self) -> &[Cell] {
        &self.values
    }

    /// Consumes the row and returns its values in column order.
    pub fn into_values(self) -> Vec<Cell> {
        self.values
    }
}

/// Raw result of one page query: the source column names and the rows.
///
/// Source columns are whatever the query selected. They are matched to the
/// declared table schema by name when the page is built into a batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageRows {
    pub columns: Vec<String>,
    pub rows: Vec<TableRow>,
}

impl PageRows {
    pub fn new(columns: Vec<String>, rows: Vec<TableRow>) -> Self {
        Self { columns, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}
