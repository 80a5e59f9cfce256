//! Factory for builders and forges sharing one executor and configuration.

use crate::builder::QueryBuilder;
use crate::config::{DbConfig, ForgeConfig};
use crate::executor::SqlExecutor;
use crate::forge::SchemaForge;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

/// Entry point: holds the executor and hands out independent builders.
///
/// ```ignore
/// let db = Database::new(Arc::new(MyExecutor::connect(url)?))
///     .with_config(DbConfig::new().debug(true));
///
/// let drafts = db.builder().from("posts").where_("status", "draft").count_all_results();
/// db.forge().add_id().add_field("name", FieldSpec::new("VARCHAR").constraint(100))
///     .create_table("tags", true);
/// ```
///
/// Every call to [`builder`](Self::builder) or [`forge`](Self::forge) returns a
/// fresh instance with its own clause state. [`shared_builder`](Self::shared_builder)
/// exists for code that wants one long-lived builder; callers that interleave
/// chains on it will mix their clauses.
pub struct Database {
    executor: Arc<dyn SqlExecutor>,
    config: Arc<DbConfig>,
    forge_config: ForgeConfig,
    shared: OnceLock<Mutex<QueryBuilder>>,
}

impl Database {
    pub fn new(executor: Arc<dyn SqlExecutor>) -> Self {
        Self {
            executor,
            config: Arc::new(DbConfig::default()),
            forge_config: ForgeConfig::default(),
            shared: OnceLock::new(),
        }
    }

    /// Replace the configuration used by builders and forges created afterwards.
    pub fn with_config(mut self, config: DbConfig) -> Self {
        self.config = Arc::new(config);
        self.shared = OnceLock::new();
        self
    }

    /// Table options used by forges created afterwards.
    pub fn with_forge_config(mut self, forge_config: ForgeConfig) -> Self {
        self.forge_config = forge_config;
        self
    }

    /// A new, independent query builder.
    pub fn builder(&self) -> QueryBuilder {
        QueryBuilder::with_config(self.executor.clone(), self.config.clone())
    }

    /// A new, independent schema forge.
    pub fn forge(&self) -> SchemaForge {
        SchemaForge::with_config(
            self.executor.clone(),
            self.config.clone(),
            self.forge_config.clone(),
        )
    }

    /// The one builder shared by every caller of this method.
    ///
    /// The lock only serializes access; it does not isolate chains. Finish a
    /// chain (or call `reset`) before releasing the guard.
    pub fn shared_builder(&self) -> MutexGuard<'_, QueryBuilder> {
        self.shared
            .get_or_init(|| Mutex::new(self.builder()))
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn executor(&self) -> &Arc<dyn SqlExecutor> {
        &self.executor
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    pub fn forge_config(&self) -> &ForgeConfig {
        &self.forge_config
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("config", &self.config)
            .field("forge_config", &self.forge_config)
            .field("table_prefix", &self.executor.table_prefix())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryExecutor;

    #[test]
    fn builders_are_independent() {
        let db = Database::new(Arc::new(MemoryExecutor::new()));
        let mut a = db.builder();
        let b = db.builder();
        a.from("t").where_("x", 1);
        assert!(!a.is_pristine());
        assert!(b.is_pristine());
    }

    #[test]
    fn shared_builder_keeps_state_between_guards() {
        let db = Database::new(Arc::new(MemoryExecutor::new()));
        db.shared_builder().from("t");
        assert_eq!(db.shared_builder().to_sql(), "SELECT * FROM t");
        db.shared_builder().reset();
        assert!(db.shared_builder().is_pristine());
    }

    #[test]
    fn config_flows_into_children() {
        let db = Database::new(Arc::new(MemoryExecutor::new()))
            .with_config(DbConfig::new().debug(true))
            .with_forge_config(ForgeConfig::bare());
        assert!(db.builder().config().debug);
        assert_eq!(db.forge().forge_config(), &ForgeConfig::bare());
    }
}
