//! Materialized query results with positional and sequential access.

use crate::error::DbResult;
use crate::row::{FromRow, Row, RowMap};
use std::cell::OnceCell;

/// Rows returned by [`QueryBuilder::get`](crate::QueryBuilder::get).
///
/// Rows are fixed at construction. Two views are available: [`result`](Self::result)
/// hands out the rows themselves, [`result_array`](Self::result_array) plain
/// maps (converted on first use, then cached). `next_row`/`previous_row` share
/// a cursor owned by this instance.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    rows: Vec<Row>,
    num_rows: usize,
    maps: OnceCell<Vec<RowMap>>,
    cursor: usize,
}

impl ResultSet {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            num_rows: rows.len(),
            rows,
            maps: OnceCell::new(),
            cursor: 0,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// All rows.
    pub fn result(&self) -> &[Row] {
        &self.rows
    }

    /// All rows as plain maps. Conversion happens once per result set.
    pub fn result_array(&self) -> &[RowMap] {
        self.maps
            .get_or_init(|| self.rows.iter().map(Row::to_map).collect())
    }

    /// Map every row into `T`.
    pub fn result_as<T: FromRow>(&self) -> DbResult<Vec<T>> {
        self.rows.iter().map(T::from_row).collect()
    }

    /// Row `n`, or `None` when out of range.
    pub fn row(&self, n: usize) -> Option<&Row> {
        self.rows.get(n)
    }

    /// Row `n` as a plain map, or `None` when out of range.
    pub fn row_array(&self, n: usize) -> Option<&RowMap> {
        self.result_array().get(n)
    }

    /// Row `n` mapped into `T`. `Ok(None)` when out of range.
    pub fn row_as<T: FromRow>(&self, n: usize) -> DbResult<Option<T>> {
        self.rows.get(n).map(T::from_row).transpose()
    }

    pub fn first_row(&self) -> Option<&Row> {
        self.rows.first()
    }

    pub fn last_row(&self) -> Option<&Row> {
        self.rows.last()
    }

    pub fn first_row_array(&self) -> Option<&RowMap> {
        self.result_array().first()
    }

    pub fn last_row_array(&self) -> Option<&RowMap> {
        self.result_array().last()
    }

    /// Advance the cursor and return the row under it.
    ///
    /// After the last row this returns `None` once and rewinds to the start.
    pub fn next_row(&mut self) -> Option<&Row> {
        if self.cursor < self.num_rows {
            self.cursor += 1;
            self.rows.get(self.cursor - 1)
        } else {
            self.cursor = 0;
            None
        }
    }

    /// Step the cursor back and return the row before the current one.
    ///
    /// Returns `None` (without moving) when already at the first row.
    pub fn previous_row(&mut self) -> Option<&Row> {
        if self.cursor >= 2 {
            self.cursor -= 1;
            self.rows.get(self.cursor - 1)
        } else {
            None
        }
    }

    /// Row last returned by `next_row`/`previous_row`.
    pub fn current_row(&self) -> Option<&Row> {
        self.cursor.checked_sub(1).and_then(|i| self.rows.get(i))
    }

    /// Rewind the cursor to the start.
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Column count, taken from the first row (0 when empty).
    pub fn num_fields(&self) -> usize {
        self.rows.first().map_or(0, Row::len)
    }

    /// Column names, taken from the first row.
    pub fn field_names(&self) -> Vec<&str> {
        self.rows
            .first()
            .map(|row| row.column_names().collect())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows == 0
    }

    /// Release the row data.
    pub fn free_result(&mut self) {
        self.rows = Vec::new();
        self.maps = OnceCell::new();
        self.num_rows = 0;
        self.cursor = 0;
    }

    /// Rows as a JSON array of objects.
    pub fn to_json(&self) -> DbResult<serde_json::Value> {
        Ok(serde_json::to_value(&self.rows)?)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }
}

impl From<Vec<Row>> for ResultSet {
    fn from(rows: Vec<Row>) -> Self {
        Self::new(rows)
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
