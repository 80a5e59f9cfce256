//! The execution service seam.

use crate::error::DbResult;
use crate::escape;
use crate::row::Row;
use crate::value::{ColumnMap, Value};

/// The SQL execution and escaping service the builder and forge delegate to.
///
/// dbforge never opens connections itself. Everything that touches the
/// database (running statements, quoting literals, reporting the last error,
/// supplying the table prefix) goes through this trait, so an implementation
/// can wrap any MySQL driver or an in-process fake such as
/// [`MemoryExecutor`](crate::MemoryExecutor).
///
/// The trait is object safe; builders hold it as `Arc<dyn SqlExecutor>`.
pub trait SqlExecutor: Send + Sync {
    /// Run a SELECT and return every row.
    fn execute_query(&self, sql: &str) -> DbResult<Vec<Row>>;

    /// Run a query expected to produce a single value (e.g. `COUNT(*)`).
    fn execute_scalar(&self, sql: &str) -> DbResult<Value>;

    /// Run a statement that returns no rows (DDL, TRUNCATE, DELETE-all).
    ///
    /// Returns the number of affected rows when the driver reports it.
    fn execute_statement(&self, sql: &str) -> DbResult<u64>;

    /// Insert one row, returning the generated id (0 when the table has none).
    fn insert_row(&self, table: &str, data: &ColumnMap) -> DbResult<u64>;

    /// Update rows matching every `conditions` equality, returning the affected count.
    fn update_rows(&self, table: &str, data: &ColumnMap, conditions: &ColumnMap)
    -> DbResult<u64>;

    /// Delete rows matching every `conditions` equality, returning the affected count.
    fn delete_rows(&self, table: &str, conditions: &ColumnMap) -> DbResult<u64>;

    /// Apply a CREATE TABLE statement idempotently.
    ///
    /// A table that already matches is left untouched; a table that differs is
    /// altered towards the definition. Neither case is an error.
    fn reconcile_schema(&self, ddl: &str) -> DbResult<()>;

    /// Prefix prepended to every unqualified table name.
    fn table_prefix(&self) -> &str {
        ""
    }

    /// Render a value as a safely quoted literal.
    fn escape_literal(&self, value: &Value) -> String {
        escape::quote_literal(value)
    }

    /// Neutralize `%` and `_` in text destined for a LIKE pattern.
    fn escape_like_wildcards(&self, text: &str) -> String {
        escape::escape_like(text)
    }

    /// Message of the most recent failure, if the last operation failed.
    fn last_error(&self) -> Option<String>;

    /// SQL the service rendered for its most recent operation.
    ///
    /// `insert_row`/`update_rows`/`delete_rows` render their own statements;
    /// this is how the builder learns what actually ran.
    fn last_query(&self) -> Option<String> {
        None
    }

    /// Id generated by the most recent insert.
    fn last_insert_id(&self) -> u64 {
        0
    }

    /// Rows affected by the most recent statement.
    fn rows_affected(&self) -> u64 {
        0
    }
}
