//! Builder and forge configuration.

use crate::monitor::QueryMonitor;
use std::fmt;
use std::sync::Arc;

/// How `update`/`delete` hand their WHERE conditions to the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WhereMode {
    /// Use the typed `(column, value)` bindings recorded by `where_`.
    ///
    /// When every AND-group condition is a plain equality (and there is no
    /// OR-group), the bindings go to `update_rows`/`delete_rows` as a map.
    /// Otherwise the full statement is rendered and run through
    /// `execute_statement`, so no condition is lost.
    #[default]
    Structured,
    /// Split each rendered `where_` fragment on `" = "` and strip quotes.
    ///
    /// Fragments that don't split into exactly two parts are dropped, and
    /// `where_in`/`like`/`or_where` conditions never reach the executor.
    /// Kept for callers that depend on the historical behavior.
    Legacy,
}

/// Configuration shared by builders handed out from one [`Database`](crate::Database).
#[derive(Clone)]
pub struct DbConfig {
    /// Verbose diagnostics: every statement is logged at DEBUG and failures
    /// include the full SQL.
    pub debug: bool,
    /// WHERE hand-off strategy for `update`/`delete`.
    pub where_mode: WhereMode,
    /// Truncate SQL in log lines. `None` means no truncation.
    pub max_sql_length: Option<usize>,
    /// Receives every executed statement.
    pub monitor: Option<Arc<dyn QueryMonitor>>,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            debug: false,
            where_mode: WhereMode::Structured,
            max_sql_length: Some(200),
            monitor: None,
        }
    }
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("debug", &self.debug)
            .field("where_mode", &self.where_mode)
            .field("max_sql_length", &self.max_sql_length)
            .field("monitor", &self.monitor.as_ref().map(|_| "<dyn QueryMonitor>"))
            .finish()
    }
}

impl DbConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable verbose diagnostics.
    pub fn debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }

    /// Set the WHERE hand-off strategy.
    pub fn where_mode(mut self, mode: WhereMode) -> Self {
        self.where_mode = mode;
        self
    }

    /// Use the historical string re-parse for `update`/`delete`.
    pub fn legacy_where(self) -> Self {
        self.where_mode(WhereMode::Legacy)
    }

    /// Set maximum SQL length in log lines.
    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    /// Disable SQL truncation in log lines.
    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    /// Attach a query monitor.
    pub fn monitor(mut self, monitor: Arc<dyn QueryMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }
}

/// Table options appended to CREATE TABLE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForgeConfig {
    /// Storage engine (`ENGINE=...`). `None` leaves the server default.
    pub engine: Option<String>,
    /// Default character set.
    pub charset: Option<String>,
    /// Default collation.
    pub collate: Option<String>,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            engine: None,
            charset: Some("utf8mb4".to_string()),
            collate: Some("utf8mb4_unicode_520_ci".to_string()),
        }
    }
}

impl ForgeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// No table options at all.
    pub fn bare() -> Self {
        Self {
            engine: None,
            charset: None,
            collate: None,
        }
    }

    pub fn engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = Some(engine.into());
        self
    }

    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    pub fn collate(mut self, collate: impl Into<String>) -> Self {
        self.collate = Some(collate.into());
        self
    }

    /// Render the table options (`ENGINE=InnoDB DEFAULT CHARSET=... COLLATE ...`).
    pub fn table_options(&self) -> String {
        let mut parts = Vec::new();
        if let Some(engine) = &self.engine {
            parts.push(format!("ENGINE={engine}"));
        }
        if let Some(charset) = &self.charset {
            parts.push(format!("DEFAULT CHARSET={charset}"));
        }
        if let Some(collate) = &self.collate {
            parts.push(format!("COLLATE {collate}"));
        }
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_config_defaults() {
        let config = DbConfig::default();
        assert!(!config.debug);
        assert_eq!(config.where_mode, WhereMode::Structured);
        assert_eq!(config.max_sql_length, Some(200));
        assert!(config.monitor.is_none());
    }

    #[test]
    fn db_config_builder() {
        let config = DbConfig::new().debug(true).legacy_where().no_truncate();
        assert!(config.debug);
        assert_eq!(config.where_mode, WhereMode::Legacy);
        assert_eq!(config.max_sql_length, None);
    }

    #[test]
    fn forge_table_options() {
        assert_eq!(
            ForgeConfig::default().table_options(),
            "DEFAULT CHARSET=utf8mb4 COLLATE utf8mb4_unicode_520_ci"
        );
        assert_eq!(
            ForgeConfig::bare().engine("InnoDB").table_options(),
            "ENGINE=InnoDB"
        );
        assert_eq!(ForgeConfig::bare().table_options(), "");
    }
}
