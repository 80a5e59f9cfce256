//! Shared execution path: time the call, log, notify the monitor.

use crate::config::DbConfig;
use crate::error::DbResult;
use crate::executor::SqlExecutor;
use crate::monitor::{QueryEvent, QueryOutcome, display_sql};
use std::time::Instant;

/// Result of one executor call plus the SQL that ran.
pub(crate) struct Executed<T> {
    pub result: DbResult<T>,
    pub sql: String,
}

/// Who rendered the statement.
pub(crate) enum Statement<'a> {
    /// dbforge rendered it; `sql` is exactly what ran.
    Rendered(&'a str),
    /// The executor renders its own SQL (`insert_row` and friends). The
    /// executor's `last_query` is preferred; the description is a fallback.
    Delegated(String),
}

pub(crate) fn run<T>(
    executor: &dyn SqlExecutor,
    config: &DbConfig,
    statement: Statement<'_>,
    call: impl FnOnce(&dyn SqlExecutor) -> DbResult<T>,
    outcome: impl FnOnce(&T) -> QueryOutcome,
) -> Executed<T> {
    let started = Instant::now();
    let result = call(executor);
    let duration = started.elapsed();

    let sql = match statement {
        Statement::Rendered(sql) => sql.to_string(),
        Statement::Delegated(description) => executor.last_query().unwrap_or(description),
    };

    let outcome = match &result {
        Ok(value) => outcome(value),
        Err(err) => QueryOutcome::error(err.to_string()),
    };

    if config.debug {
        tracing::debug!(
            target: "dbforge.sql",
            duration_us = duration.as_micros() as u64,
            outcome = %outcome,
            sql = %display_sql(&sql, config.max_sql_length),
        );
    }

    if let Err(err) = &result {
        let shown = if config.debug {
            sql.clone()
        } else {
            display_sql(&sql, config.max_sql_length)
        };
        tracing::error!(target: "dbforge.error", error = %err, sql = %shown, "statement failed");
    }

    if let Some(monitor) = &config.monitor {
        monitor.on_query(&QueryEvent::new(sql.clone(), duration, outcome));
    }

    Executed { result, sql }
}
