//! Schema forge: column/key specifications rendered into DDL.
//!
//! A [`SchemaForge`] accumulates fields, keys and foreign keys and turns them
//! into a `CREATE TABLE` statement:
//!
//! ```ignore
//! let mut forge = db.forge();
//! forge
//!     .add_id()
//!     .add_field("title", FieldSpec::new("VARCHAR").constraint(200))
//!     .add_field("author_id", FieldSpec::new("BIGINT").constraint(20).unsigned())
//!     .add_key(["author_id"], false)
//!     .add_foreign_key(ForeignKey::new("author_id", "users", "ID"));
//! forge.create_table("posts", true);
//! ```
//!
//! `create_table` hands the statement to
//! [`SqlExecutor::reconcile_schema`], so running it against an existing table
//! is not an error. The accumulated specification is consumed (reset) by
//! `create_table`; the single-statement operations (`drop_table`,
//! `rename_table`, `add_column`, `drop_column`, `modify_column`) take their
//! input directly and leave it alone.

mod field;

pub use field::{Constraint, FieldSpec, ForeignKey, ReferentialAction};

use crate::builder::prefix_table;
use crate::config::{DbConfig, ForgeConfig};
use crate::error::{DbError, DbResult};
use crate::escape::quote_ident;
use crate::exec::{Statement, run};
use crate::executor::SqlExecutor;
use crate::monitor::QueryOutcome;
use std::fmt;
use std::sync::Arc;

/// Accumulates a table specification and executes DDL.
pub struct SchemaForge {
    executor: Arc<dyn SqlExecutor>,
    config: Arc<DbConfig>,
    options: ForgeConfig,
    fields: Vec<(String, FieldSpec)>,
    keys: Vec<Vec<String>>,
    primary_keys: Vec<String>,
    foreign_keys: Vec<ForeignKey>,
    last_query: Option<String>,
    last_error: Option<String>,
}

impl SchemaForge {
    pub fn new(executor: Arc<dyn SqlExecutor>) -> Self {
        Self::with_config(executor, Arc::new(DbConfig::default()), ForgeConfig::default())
    }

    pub fn with_config(
        executor: Arc<dyn SqlExecutor>,
        config: Arc<DbConfig>,
        options: ForgeConfig,
    ) -> Self {
        Self {
            executor,
            config,
            options,
            fields: Vec::new(),
            keys: Vec::new(),
            primary_keys: Vec::new(),
            foreign_keys: Vec::new(),
            last_query: None,
            last_error: None,
        }
    }

    // ==================== Specification ====================

    /// The `id` shorthand: `BIGINT(20) UNSIGNED NOT NULL AUTO_INCREMENT`, primary key.
    pub fn add_id(&mut self) -> &mut Self {
        self.add_field(
            "id",
            FieldSpec::new("BIGINT")
                .constraint(20)
                .unsigned()
                .auto_increment(),
        );
        self.add_key(["id"], true)
    }

    /// Add a column. A second field with the same name replaces the first in place.
    pub fn add_field(&mut self, name: &str, spec: FieldSpec) -> &mut Self {
        let name = name.trim();
        match self.fields.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = spec,
            None => self.fields.push((name.to_string(), spec)),
        }
        self
    }

    pub fn add_fields<I, K>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, FieldSpec)>,
        K: AsRef<str>,
    {
        for (name, spec) in fields {
            self.add_field(name.as_ref(), spec);
        }
        self
    }

    /// Add a key over `columns`. Primary key columns accumulate into a single
    /// composite `PRIMARY KEY`; every other call adds its own `KEY`.
    pub fn add_key<I, S>(&mut self, columns: I, primary: bool) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let columns: Vec<String> = columns
            .into_iter()
            .map(|c| c.as_ref().trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        if columns.is_empty() {
            return self;
        }
        if primary {
            for column in columns {
                if !self.primary_keys.contains(&column) {
                    self.primary_keys.push(column);
                }
            }
        } else {
            self.keys.push(columns);
        }
        self
    }

    pub fn add_foreign_key(&mut self, foreign_key: ForeignKey) -> &mut Self {
        self.foreign_keys.push(foreign_key);
        self
    }

    /// Drop the accumulated specification.
    pub fn reset(&mut self) -> &mut Self {
        self.fields.clear();
        self.keys.clear();
        self.primary_keys.clear();
        self.foreign_keys.clear();
        self
    }

    pub fn is_pristine(&self) -> bool {
        self.fields.is_empty()
            && self.keys.is_empty()
            && self.primary_keys.is_empty()
            && self.foreign_keys.is_empty()
    }

    // ==================== Rendering ====================

    /// Render one column definition.
    pub fn build_field_definition(&self, name: &str, spec: &FieldSpec) -> String {
        spec.render(name, &*self.executor)
    }

    /// The CREATE TABLE the accumulated specification renders to. Does not reset.
    pub fn to_create_table_sql(&self, table: &str, if_not_exists: bool) -> DbResult<String> {
        if self.fields.is_empty() {
            return Err(DbError::validation(format!(
                "table {} has no fields",
                table.trim()
            )));
        }

        let mut lines: Vec<String> = self
            .fields
            .iter()
            .map(|(name, spec)| self.build_field_definition(name, spec))
            .collect();

        if !self.primary_keys.is_empty() {
            lines.push(format!("PRIMARY KEY ({})", quote_list(&self.primary_keys)));
        }
        for key in &self.keys {
            lines.push(format!(
                "KEY {} ({})",
                quote_ident(&key.join("_")),
                quote_list(key)
            ));
        }
        for fk in &self.foreign_keys {
            lines.push(format!(
                "FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE {} ON UPDATE {}",
                quote_ident(fk.field.trim()),
                self.table_ident(&fk.reference_table),
                quote_ident(fk.reference_field.trim()),
                fk.on_delete,
                fk.on_update
            ));
        }

        let mut sql = String::from("CREATE TABLE ");
        if if_not_exists {
            sql.push_str("IF NOT EXISTS ");
        }
        sql.push_str(&self.table_ident(table));
        sql.push_str(" (\n");
        sql.push_str(&lines.join(",\n"));
        sql.push_str("\n)");
        let options = self.options.table_options();
        if !options.is_empty() {
            sql.push(' ');
            sql.push_str(&options);
        }
        Ok(sql)
    }

    fn table_ident(&self, table: &str) -> String {
        quote_ident(&prefix_table(self.executor.table_prefix(), table))
    }

    // ==================== Execution ====================

    /// Create (or reconcile) `table` from the accumulated specification, then reset.
    ///
    /// An existing table in a compatible shape also reports success.
    pub fn create_table(&mut self, table: &str, if_not_exists: bool) -> bool {
        let ok = match self.to_create_table_sql(table, if_not_exists) {
            Ok(sql) => {
                let executed = run(
                    &*self.executor,
                    &self.config,
                    Statement::Rendered(&sql),
                    |ex| ex.reconcile_schema(&sql),
                    |_| QueryOutcome::Done,
                );
                self.finish(executed.sql, executed.result.map(|_| ()))
            }
            Err(err) => self.refuse(err.to_string()),
        };
        self.reset();
        ok
    }

    pub fn drop_table(&mut self, table: &str, if_exists: bool) -> bool {
        let guard = if if_exists { "IF EXISTS " } else { "" };
        let sql = format!("DROP TABLE {guard}{}", self.table_ident(table));
        self.execute(sql)
    }

    pub fn rename_table(&mut self, from: &str, to: &str) -> bool {
        if from.trim().is_empty() || to.trim().is_empty() {
            return self.refuse("rename_table needs both table names".to_string());
        }
        let sql = format!(
            "ALTER TABLE {} RENAME TO {}",
            self.table_ident(from),
            self.table_ident(to)
        );
        self.execute(sql)
    }

    /// `ALTER TABLE t ADD COLUMN ...` for every field, honoring `after`.
    pub fn add_column<I, K>(&mut self, table: &str, fields: I) -> bool
    where
        I: IntoIterator<Item = (K, FieldSpec)>,
        K: AsRef<str>,
    {
        let parts: Vec<String> = fields
            .into_iter()
            .map(|(name, spec)| {
                let definition = self.build_field_definition(name.as_ref(), &spec);
                let mut part = format!("ADD COLUMN {definition}");
                if let Some(after) = &spec.after {
                    part.push_str(" AFTER ");
                    part.push_str(&quote_ident(after.trim()));
                }
                part
            })
            .collect();
        self.alter(table, parts)
    }

    pub fn drop_column(&mut self, table: &str, column: &str) -> bool {
        let part = format!("DROP COLUMN {}", quote_ident(column.trim()));
        self.alter(table, vec![part])
    }

    /// `ALTER TABLE t MODIFY COLUMN ...`, or `CHANGE old new ...` when a field
    /// carries a `new_name`.
    pub fn modify_column<I, K>(&mut self, table: &str, fields: I) -> bool
    where
        I: IntoIterator<Item = (K, FieldSpec)>,
        K: AsRef<str>,
    {
        let parts: Vec<String> = fields
            .into_iter()
            .map(|(name, spec)| {
                let name = name.as_ref().trim();
                match &spec.new_name {
                    Some(new_name) => format!(
                        "CHANGE {} {}",
                        quote_ident(name),
                        self.build_field_definition(new_name, &spec)
                    ),
                    None => format!("MODIFY COLUMN {}", self.build_field_definition(name, &spec)),
                }
            })
            .collect();
        self.alter(table, parts)
    }

    fn alter(&mut self, table: &str, parts: Vec<String>) -> bool {
        if parts.is_empty() {
            return self.refuse(format!("alter of {} has no columns", table.trim()));
        }
        let sql = format!("ALTER TABLE {} {}", self.table_ident(table), parts.join(", "));
        self.execute(sql)
    }

    fn execute(&mut self, sql: String) -> bool {
        let executed = run(
            &*self.executor,
            &self.config,
            Statement::Rendered(&sql),
            |ex| ex.execute_statement(&sql),
            |n| QueryOutcome::Affected(*n),
        );
        self.finish(executed.sql, executed.result.map(|_| ()))
    }

    // ==================== Introspection ====================

    pub fn last_query(&self) -> Option<&str> {
        self.last_query.as_deref()
    }

    /// Last failure: the executor's error, or the forge's own validation message.
    pub fn last_error(&self) -> Option<String> {
        self.executor
            .last_error()
            .or_else(|| self.last_error.clone())
    }

    pub fn forge_config(&self) -> &ForgeConfig {
        &self.options
    }

    fn finish(&mut self, sql: String, result: DbResult<()>) -> bool {
        self.last_query = Some(sql);
        match result {
            Ok(()) => {
                self.last_error = None;
                true
            }
            Err(err) => {
                self.last_error = Some(err.to_string());
                false
            }
        }
    }

    fn refuse(&mut self, message: String) -> bool {
        tracing::warn!(target: "dbforge.error", "{message}; statement not sent");
        self.last_error = Some(message);
        false
    }
}

fn quote_list(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Debug for SchemaForge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaForge")
            .field("fields", &self.fields)
            .field("keys", &self.keys)
            .field("primary_keys", &self.primary_keys)
            .field("foreign_keys", &self.foreign_keys)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
