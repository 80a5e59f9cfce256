//! Chainable query builder.
//!
//! A [`QueryBuilder`] accumulates clause fragments across chained calls and
//! renders them when a terminal operation runs:
//!
//! ```ignore
//! let posts = db
//!     .builder()
//!     .select("ID, post_title")
//!     .from("posts")
//!     .where_("post_status", "publish")
//!     .where_in("post_type", ["post", "page"])
//!     .or_like("post_title", "rust", LikeSide::Both)
//!     .order_by("post_date", "DESC")
//!     .limit(10)
//!     .get();
//! ```
//!
//! ## Lifecycle
//!
//! - Mutators append to the builder's state and return `&mut Self`.
//! - Terminals (`get`, `count_all_results`, `insert`, `insert_batch`,
//!   `update`, `delete`) render, execute and then reset every clause,
//!   whether execution succeeded or not. Only `last_query` (and the last
//!   recorded error) survive.
//! - Failures never panic or propagate: `get` yields an empty
//!   [`ResultSet`](crate::ResultSet), counts yield 0, writes yield `false`.
//!   Inspect [`QueryBuilder::error`] for details.
//!
//! A builder is plain mutable state. Don't share one between call sites that
//! may interleave their chains; take a fresh one from
//! [`Database::builder`](crate::Database::builder) instead.

mod clause;
mod select;
mod write;

pub use clause::{Direction, LikeSide};

use crate::config::DbConfig;
use crate::error::DbError;
use crate::executor::SqlExecutor;
use crate::value::Operand;
use clause::Clause;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Last failure as seen by a builder.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryError {
    /// Executor's last error, or the builder's own record of it.
    pub message: Option<String>,
    /// Most recently rendered SQL.
    pub query: Option<String>,
}

/// Fluent SELECT/INSERT/UPDATE/DELETE builder over a [`SqlExecutor`].
pub struct QueryBuilder {
    executor: Arc<dyn SqlExecutor>,
    config: Arc<DbConfig>,
    /// SELECT list entries (empty renders `*`)
    select: Vec<String>,
    distinct: bool,
    /// Prefixed FROM table
    from: Option<String>,
    /// Pre-rendered JOIN clauses
    joins: Vec<String>,
    /// AND-group, in render order: wheres, where_in, where_not_in, likes
    wheres: Vec<Clause>,
    where_in: Vec<String>,
    where_not_in: Vec<String>,
    likes: Vec<String>,
    /// OR-group, in render order: or_wheres, or_likes
    or_wheres: Vec<String>,
    or_likes: Vec<String>,
    group_by: Vec<String>,
    having: Vec<String>,
    order_by: Vec<(String, Direction)>,
    limit: Option<u64>,
    offset: Option<u64>,
    /// Column values for INSERT/UPDATE
    set: BTreeMap<String, Operand>,
    last_query: Option<String>,
    last_error: Option<String>,
}

impl QueryBuilder {
    /// Create a builder with the default configuration.
    pub fn new(executor: Arc<dyn SqlExecutor>) -> Self {
        Self::with_config(executor, Arc::new(DbConfig::default()))
    }

    pub fn with_config(executor: Arc<dyn SqlExecutor>, config: Arc<DbConfig>) -> Self {
        Self {
            executor,
            config,
            select: Vec::new(),
            distinct: false,
            from: None,
            joins: Vec::new(),
            wheres: Vec::new(),
            where_in: Vec::new(),
            where_not_in: Vec::new(),
            likes: Vec::new(),
            or_wheres: Vec::new(),
            or_likes: Vec::new(),
            group_by: Vec::new(),
            having: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            set: BTreeMap::new(),
            last_query: None,
            last_error: None,
        }
    }

    /// Clear every accumulated clause. `last_query` is kept.
    pub fn reset(&mut self) -> &mut Self {
        self.select.clear();
        self.distinct = false;
        self.from = None;
        self.joins.clear();
        self.wheres.clear();
        self.where_in.clear();
        self.where_not_in.clear();
        self.likes.clear();
        self.or_wheres.clear();
        self.or_likes.clear();
        self.group_by.clear();
        self.having.clear();
        self.order_by.clear();
        self.limit = None;
        self.offset = None;
        self.set.clear();
        self
    }

    /// True when no clause has been accumulated since the last reset.
    pub fn is_pristine(&self) -> bool {
        self.select.is_empty()
            && !self.distinct
            && self.from.is_none()
            && self.joins.is_empty()
            && !self.has_conditions()
            && self.group_by.is_empty()
            && self.having.is_empty()
            && self.order_by.is_empty()
            && self.limit.is_none()
            && self.offset.is_none()
            && self.set.is_empty()
    }

    /// Most recently rendered (or executor-reported) SQL.
    pub fn last_query(&self) -> Option<&str> {
        self.last_query.as_deref()
    }

    /// Last failure: this builder's own record (an executor failure or a
    /// refused statement), falling back to the executor's last error.
    pub fn error(&self) -> QueryError {
        QueryError {
            message: self
                .last_error
                .clone()
                .or_else(|| self.executor.last_error()),
            query: self.last_query.clone(),
        }
    }

    /// Record a failed execution, preferring the executor's own message.
    fn record_failure(&mut self, err: &DbError) {
        self.last_error = Some(
            self.executor
                .last_error()
                .unwrap_or_else(|| err.to_string()),
        );
    }

    /// Id generated by the executor's most recent insert.
    pub fn insert_id(&self) -> u64 {
        self.executor.last_insert_id()
    }

    /// Rows affected by the executor's most recent statement.
    pub fn affected_rows(&self) -> u64 {
        self.executor.rows_affected()
    }

    /// The configuration this builder logs and monitors with.
    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    /// Prepend the executor's table prefix unless the name is schema-qualified
    /// or a derived table.
    pub(crate) fn prefixed(&self, table: &str) -> String {
        prefix_table(self.executor.table_prefix(), table)
    }

    fn has_conditions(&self) -> bool {
        !(self.wheres.is_empty()
            && self.where_in.is_empty()
            && self.where_not_in.is_empty()
            && self.likes.is_empty()
            && self.or_wheres.is_empty()
            && self.or_likes.is_empty())
    }
}

pub(crate) fn prefix_table(prefix: &str, table: &str) -> String {
    let table = table.trim();
    if prefix.is_empty() || table.starts_with('(') || table.contains('.') {
        table.to_string()
    } else {
        format!("{prefix}{table}")
    }
}

impl fmt::Debug for QueryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("sql", &self.to_sql())
            .field("set", &self.set)
            .field("last_query", &self.last_query)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
