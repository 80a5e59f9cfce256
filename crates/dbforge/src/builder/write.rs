use super::clause::{is_legacy_equality, parse_legacy_where};
use super::QueryBuilder;
use crate::config::WhereMode;
use crate::error::DbResult;
use crate::escape::quote_ident;
use crate::exec::{Statement, run};
use crate::monitor::QueryOutcome;
use crate::value::{ColumnMap, IntoOperand, Operand, Value};
use std::collections::BTreeMap;

/// How an UPDATE/DELETE reaches the executor.
enum WherePlan {
    /// Equality map for `update_rows`/`delete_rows`, with the same
    /// conditions as rendered SQL for paths that must render the statement.
    Map { conditions: ColumnMap, sql: String },
    /// Full rendered WHERE condition for `execute_statement`.
    Rendered(String),
}

impl WherePlan {
    fn into_condition(self) -> String {
        match self {
            WherePlan::Rendered(sql) | WherePlan::Map { sql, .. } => sql,
        }
    }
}

impl QueryBuilder {
    // ==================== INSERT ====================

    /// Insert the accumulated `set` values into `table`, then reset.
    pub fn insert(&mut self, table: &str) -> bool {
        let data = std::mem::take(&mut self.set);
        let ok = self.insert_one(table, data);
        self.reset();
        ok
    }

    /// Replace the accumulated `set` values with `data` and insert.
    pub fn insert_with<I, K, V>(&mut self, table: &str, data: I) -> bool
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: IntoOperand,
    {
        self.set.clear();
        self.set_map(data);
        self.insert(table)
    }

    /// Insert each row separately. Every row is attempted even after a
    /// failure; the result is true only if all of them succeeded.
    pub fn insert_batch<R, I, K, V>(&mut self, table: &str, rows: R) -> bool
    where
        R: IntoIterator<Item = I>,
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: IntoOperand,
    {
        let mut all_ok = true;
        for row in rows {
            let data: BTreeMap<String, Operand> = row
                .into_iter()
                .map(|(k, v)| (k.as_ref().trim().to_string(), v.into_operand()))
                .collect();
            let ok = self.insert_one(table, data);
            all_ok &= ok;
        }
        self.reset();
        all_ok
    }

    fn insert_one(&mut self, table: &str, data: BTreeMap<String, Operand>) -> bool {
        let table = self.prefixed(table);
        if data.is_empty() {
            tracing::warn!(
                target: "dbforge.error",
                table = %table,
                "insert without values skipped"
            );
            self.last_error = Some(format!("insert into {table} has no values"));
            return false;
        }

        let executed = if data.values().any(Operand::is_raw) {
            let sql = self.render_insert(&table, &data);
            run(
                &*self.executor,
                &self.config,
                Statement::Rendered(&sql),
                |ex| ex.execute_statement(&sql),
                |n| QueryOutcome::Affected(*n),
            )
        } else {
            let values = into_column_map(data);
            let description = format!("INSERT INTO {table}");
            run(
                &*self.executor,
                &self.config,
                Statement::Delegated(description),
                |ex| ex.insert_row(&table, &values),
                |_| QueryOutcome::Affected(1),
            )
        };

        self.finish(executed.sql, executed.result.map(|_| ()))
    }

    fn render_insert(&self, table: &str, data: &BTreeMap<String, Operand>) -> String {
        let columns: Vec<String> = data.keys().map(|c| quote_ident(c)).collect();
        let values: Vec<String> = data.values().map(|v| self.render_operand(v)).collect();
        format!(
            "INSERT INTO {table} ({}) VALUES ({})",
            columns.join(", "),
            values.join(", ")
        )
    }

    fn render_operand(&self, operand: &Operand) -> String {
        match operand {
            Operand::Value(value) => self.executor.escape_literal(value),
            Operand::Raw(sql) => sql.clone(),
        }
    }

    // ==================== UPDATE ====================

    /// Update `table` with the accumulated `set` values and WHERE state, then reset.
    ///
    /// See [`WhereMode`] for how the conditions reach the executor. An update
    /// without any condition is refused (returns `false`); use a raw
    /// `where_("1", raw("1"))` if every row really should change.
    pub fn update(&mut self, table: &str) -> bool {
        let ok = self.update_inner(table);
        self.reset();
        ok
    }

    /// Merge `data` into `set` and `conditions` into the AND-group, then update.
    pub fn update_with<D, W, K1, V1, K2, V2>(
        &mut self,
        table: &str,
        data: D,
        conditions: W,
    ) -> bool
    where
        D: IntoIterator<Item = (K1, V1)>,
        K1: AsRef<str>,
        V1: IntoOperand,
        W: IntoIterator<Item = (K2, V2)>,
        K2: AsRef<str>,
        V2: IntoOperand,
    {
        self.set_map(data);
        self.where_map(conditions);
        self.update(table)
    }

    fn update_inner(&mut self, table: &str) -> bool {
        let table = self.prefixed(table);
        if self.set.is_empty() {
            return self.refuse(format!("update of {table} has no values"));
        }
        let plan = match self.where_plan() {
            Some(plan) => plan,
            None => return self.refuse(format!("update of {table} has no WHERE conditions")),
        };

        let executed = match plan {
            WherePlan::Map { conditions, .. } if !self.set.values().any(Operand::is_raw) => {
                let values = into_column_map(self.set.clone());
                let description = format!("UPDATE {table}");
                run(
                    &*self.executor,
                    &self.config,
                    Statement::Delegated(description),
                    |ex| ex.update_rows(&table, &values, &conditions),
                    |n| QueryOutcome::Affected(*n),
                )
            }
            plan => {
                let assignments: Vec<String> = self
                    .set
                    .iter()
                    .map(|(col, v)| format!("{} = {}", quote_ident(col), self.render_operand(v)))
                    .collect();
                let cond = plan.into_condition();
                let sql = format!("UPDATE {table} SET {} WHERE {cond}", assignments.join(", "));
                run(
                    &*self.executor,
                    &self.config,
                    Statement::Rendered(&sql),
                    |ex| ex.execute_statement(&sql),
                    |n| QueryOutcome::Affected(*n),
                )
            }
        };

        self.finish(executed.sql, executed.result.map(|_| ()))
    }

    // ==================== DELETE ====================

    /// Delete rows of `table` matching the accumulated WHERE state, then reset.
    ///
    /// A delete without conditions is refused; use [`empty_table`](Self::empty_table)
    /// or [`truncate`](Self::truncate) to remove every row.
    pub fn delete(&mut self, table: &str) -> bool {
        let ok = self.delete_inner(table);
        self.reset();
        ok
    }

    /// Merge `conditions` into the AND-group, then delete.
    pub fn delete_where<I, K, V>(&mut self, table: &str, conditions: I) -> bool
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: IntoOperand,
    {
        self.where_map(conditions);
        self.delete(table)
    }

    fn delete_inner(&mut self, table: &str) -> bool {
        let table = self.prefixed(table);
        let plan = match self.where_plan() {
            Some(plan) => plan,
            None => return self.refuse(format!("delete from {table} has no WHERE conditions")),
        };

        let executed = match plan {
            WherePlan::Map { conditions, .. } => {
                let description = format!("DELETE FROM {table}");
                run(
                    &*self.executor,
                    &self.config,
                    Statement::Delegated(description),
                    |ex| ex.delete_rows(&table, &conditions),
                    |n| QueryOutcome::Affected(*n),
                )
            }
            WherePlan::Rendered(cond) => {
                let sql = format!("DELETE FROM {table} WHERE {cond}");
                run(
                    &*self.executor,
                    &self.config,
                    Statement::Rendered(&sql),
                    |ex| ex.execute_statement(&sql),
                    |n| QueryOutcome::Affected(*n),
                )
            }
        };

        self.finish(executed.sql, executed.result.map(|_| ()))
    }

    /// Decide how the accumulated conditions reach the executor.
    ///
    /// `None` means there is nothing to restrict the statement with.
    fn where_plan(&self) -> Option<WherePlan> {
        match self.config.where_mode {
            WhereMode::Legacy => {
                let fragments: Vec<&str> = self
                    .wheres
                    .iter()
                    .map(|c| c.sql.as_str())
                    .filter(|sql| is_legacy_equality(sql))
                    .collect();
                let conditions = parse_legacy_where(fragments.iter().copied());
                if conditions.is_empty() {
                    return None;
                }
                let sql = format!("({})", fragments.join(" AND "));
                Some(WherePlan::Map { conditions, sql })
            }
            WhereMode::Structured => {
                let cond = self.where_clause()?;
                let only_equalities = self.where_in.is_empty()
                    && self.where_not_in.is_empty()
                    && self.likes.is_empty()
                    && self.or_wheres.is_empty()
                    && self.or_likes.is_empty()
                    && self.wheres.iter().all(|c| c.binding.is_some());
                if !only_equalities {
                    return Some(WherePlan::Rendered(cond));
                }
                let mut conditions = ColumnMap::new();
                for (column, value) in self.wheres.iter().filter_map(|c| c.binding.clone()) {
                    // The same column twice can't be expressed as a map.
                    if conditions.insert(column, value).is_some() {
                        return Some(WherePlan::Rendered(cond));
                    }
                }
                Some(WherePlan::Map { conditions, sql: cond })
            }
        }
    }

    // ==================== Whole-table statements ====================

    /// `TRUNCATE TABLE`. Leaves accumulated clauses untouched.
    pub fn truncate(&mut self, table: &str) -> bool {
        let sql = format!("TRUNCATE TABLE {}", self.prefixed(table));
        self.execute_direct(sql)
    }

    /// `DELETE FROM` without conditions. Leaves accumulated clauses untouched.
    pub fn empty_table(&mut self, table: &str) -> bool {
        let sql = format!("DELETE FROM {}", self.prefixed(table));
        self.execute_direct(sql)
    }

    fn execute_direct(&mut self, sql: String) -> bool {
        let executed = run(
            &*self.executor,
            &self.config,
            Statement::Rendered(&sql),
            |ex| ex.execute_statement(&sql),
            |n| QueryOutcome::Affected(*n),
        );
        self.finish(executed.sql, executed.result.map(|_| ()))
    }

    // ==================== Helpers ====================

    fn finish(&mut self, sql: String, result: DbResult<()>) -> bool {
        self.last_query = Some(sql);
        match result {
            Ok(()) => {
                self.last_error = None;
                true
            }
            Err(err) => {
                self.record_failure(&err);
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

/// Flatten escaped operands into a value map. Raw operands become text.
fn into_column_map(data: BTreeMap<String, Operand>) -> ColumnMap {
    data.into_iter()
        .map(|(column, operand)| {
            let value = match operand {
                Operand::Value(value) => value,
                Operand::Raw(sql) => Value::Text(sql),
            };
            (column, value)
        })
        .collect()
}
