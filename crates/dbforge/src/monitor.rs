//! Query monitoring for statements issued by the builder and forge.
//!
//! Every statement the builder or forge hands to the executor produces one
//! [`QueryEvent`]. Monitors receive it after the executor returns, whether the
//! call succeeded or not.
//!
//! # Example
//!
//! ```rust,ignore
//! use dbforge::monitor::{CollectingMonitor, TracingMonitor};
//! use dbforge::{Database, DbConfig};
//! use std::sync::Arc;
//!
//! let seen = Arc::new(CollectingMonitor::new());
//! let db = Database::with_config(executor, DbConfig::new().monitor(seen.clone()));
//! db.builder().from("posts").get();
//! assert_eq!(seen.events().len(), 1);
//! ```

use std::fmt;
use std::sync::Mutex;
use std::time::Duration;
use tracing::Level;

/// Maximum length for error messages carried in `QueryOutcome::Error`.
const MAX_ERROR_LEN: usize = 512;

pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

/// Truncate SQL for display, appending `...` when shortened.
pub(crate) fn display_sql(sql: &str, max: Option<usize>) -> String {
    match max {
        Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)),
        _ => sql.to_string(),
    }
}

fn starts_with_keyword(sql: &str, keyword: &str) -> bool {
    sql.len() >= keyword.len()
        && sql.is_char_boundary(keyword.len())
        && sql[..keyword.len()].eq_ignore_ascii_case(keyword)
        && sql[keyword.len()..]
            .chars()
            .next()
            .is_none_or(|c| !c.is_ascii_alphanumeric() && c != '_')
}

/// The kind of statement being executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Select,
    Insert,
    Update,
    Delete,
    /// CREATE/ALTER/DROP/RENAME/TRUNCATE
    Ddl,
    Other,
}

impl QueryKind {
    /// Classify a statement by its leading keyword.
    pub fn from_sql(sql: &str) -> Self {
        let trimmed = sql.trim_start().trim_start_matches('(');
        if starts_with_keyword(trimmed, "SELECT") {
            QueryKind::Select
        } else if starts_with_keyword(trimmed, "INSERT") || starts_with_keyword(trimmed, "REPLACE")
        {
            QueryKind::Insert
        } else if starts_with_keyword(trimmed, "UPDATE") {
            QueryKind::Update
        } else if starts_with_keyword(trimmed, "DELETE") {
            QueryKind::Delete
        } else if ["CREATE", "ALTER", "DROP", "RENAME", "TRUNCATE"]
            .iter()
            .any(|kw| starts_with_keyword(trimmed, kw))
        {
            QueryKind::Ddl
        } else {
            QueryKind::Other
        }
    }
}

/// Outcome of one executed statement.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// Query returned rows.
    Rows(usize),
    /// Statement affected rows.
    Affected(u64),
    /// Statement succeeded without a row count.
    Done,
    /// Execution failed (message truncated to 512 bytes).
    Error(String),
}

impl QueryOutcome {
    /// Create an error outcome, truncating long messages.
    pub fn error(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        if msg.len() > MAX_ERROR_LEN {
            Self::Error(format!("{}...", truncate_sql_bytes(&msg, MAX_ERROR_LEN)))
        } else {
            Self::Error(msg)
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

impl fmt::Display for QueryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryOutcome::Rows(n) => write!(f, "{n} rows"),
            QueryOutcome::Affected(n) => write!(f, "{n} affected"),
            QueryOutcome::Done => f.write_str("ok"),
            QueryOutcome::Error(e) => write!(f, "error: {e}"),
        }
    }
}

/// One executed statement.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryEvent {
    pub sql: String,
    pub kind: QueryKind,
    pub duration: Duration,
    pub outcome: QueryOutcome,
}

impl QueryEvent {
    pub fn new(sql: impl Into<String>, duration: Duration, outcome: QueryOutcome) -> Self {
        let sql = sql.into();
        Self {
            kind: QueryKind::from_sql(&sql),
            sql,
            duration,
            outcome,
        }
    }
}

/// Receives every statement the builder or forge executes.
pub trait QueryMonitor: Send + Sync {
    fn on_query(&self, event: &QueryEvent);
}

/// A no-op monitor that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMonitor;

impl QueryMonitor for NoopMonitor {
    fn on_query(&self, _event: &QueryEvent) {}
}

/// A `tracing`-based monitor that emits one event per statement.
#[derive(Debug, Clone)]
pub struct TracingMonitor {
    /// Tracing event level for successful statements. Failures always use WARN.
    pub level: Level,
    /// Truncate long SQL strings. `None` means no truncation.
    pub max_sql_length: Option<usize>,
}

impl Default for TracingMonitor {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            max_sql_length: Some(200),
        }
    }
}

impl TracingMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the tracing event level.
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Set maximum SQL length to display.
    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    /// Disable SQL truncation.
    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }
}

impl QueryMonitor for TracingMonitor {
    fn on_query(&self, event: &QueryEvent) {
        /// Dispatch a tracing event at a runtime-determined level.
        macro_rules! emit_at_level {
            ($level:expr, $($field:tt)*) => {
                match $level {
                    Level::ERROR => tracing::error!($($field)*),
                    Level::WARN  => tracing::warn!($($field)*),
                    Level::INFO  => tracing::info!($($field)*),
                    Level::DEBUG => tracing::debug!($($field)*),
                    Level::TRACE => tracing::trace!($($field)*),
                }
            };
        }

        let sql = display_sql(&event.sql, self.max_sql_length);
        let level = if event.outcome.is_error() {
            Level::WARN
        } else {
            self.level
        };
        emit_at_level!(
            level,
            target: "dbforge.sql",
            kind = ?event.kind,
            duration_us = event.duration.as_micros() as u64,
            outcome = %event.outcome,
            sql = %sql,
        );
    }
}

/// Keeps every event in memory. Useful in tests and as a debug side channel.
#[derive(Debug, Default)]
pub struct CollectingMonitor {
    events: Mutex<Vec<QueryEvent>>,
}

impl CollectingMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events seen so far.
    pub fn events(&self) -> Vec<QueryEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// SQL of every event, in execution order.
    pub fn statements(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.sql).collect()
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl QueryMonitor for CollectingMonitor {
    fn on_query(&self, event: &QueryEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_statements() {
        assert_eq!(QueryKind::from_sql("  select 1"), QueryKind::Select);
        assert_eq!(QueryKind::from_sql("(SELECT 1) UNION (SELECT 2)"), QueryKind::Select);
        assert_eq!(QueryKind::from_sql("INSERT INTO t VALUES (1)"), QueryKind::Insert);
        assert_eq!(QueryKind::from_sql("UPDATE t SET a = 1"), QueryKind::Update);
        assert_eq!(QueryKind::from_sql("DELETE FROM t"), QueryKind::Delete);
        assert_eq!(QueryKind::from_sql("TRUNCATE TABLE t"), QueryKind::Ddl);
        assert_eq!(QueryKind::from_sql("RENAME TABLE a TO b"), QueryKind::Ddl);
        assert_eq!(QueryKind::from_sql("SELECTED"), QueryKind::Other);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let sql = "SELECT 'é'";
        let shown = display_sql(sql, Some(9));
        assert!(shown.ends_with("..."));
        assert!(shown.len() <= 12);
    }

    #[test]
    fn long_errors_are_truncated() {
        let outcome = QueryOutcome::error("x".repeat(600));
        match outcome {
            QueryOutcome::Error(msg) => assert_eq!(msg.len(), MAX_ERROR_LEN + 3),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn collecting_monitor_keeps_order() {
        let monitor = CollectingMonitor::new();
        monitor.on_query(&QueryEvent::new("SELECT 1", Duration::ZERO, QueryOutcome::Rows(1)));
        monitor.on_query(&QueryEvent::new("DELETE FROM t", Duration::ZERO, QueryOutcome::Done));
        assert_eq!(monitor.statements(), vec!["SELECT 1", "DELETE FROM t"]);
        monitor.clear();
        assert!(monitor.events().is_empty());
    }
}
