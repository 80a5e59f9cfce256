//! In-process [`SqlExecutor`] for tests, dry runs and examples.
//!
//! `MemoryExecutor` keeps tables as plain row lists and records every call it
//! receives. It does not interpret SELECT statements; query results are
//! scripted with [`push_rows`](MemoryExecutor::push_rows) and
//! [`push_scalar`](MemoryExecutor::push_scalar). The structured entry points
//! (`insert_row`, `update_rows`, `delete_rows`, `reconcile_schema`) and a few
//! whole-table statements do change the stored rows.

use crate::error::{DbError, DbResult};
use crate::escape::{quote_ident, quote_literal};
use crate::executor::SqlExecutor;
use crate::row::Row;
use crate::value::{ColumnMap, Value};
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

/// One call received by a [`MemoryExecutor`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Query(String),
    Scalar(String),
    Statement(String),
    Insert {
        table: String,
        data: ColumnMap,
    },
    Update {
        table: String,
        data: ColumnMap,
        conditions: ColumnMap,
    },
    Delete {
        table: String,
        conditions: ColumnMap,
    },
    Reconcile(String),
}

/// A stored table.
#[derive(Debug, Clone, Default)]
pub struct MemoryTable {
    /// Last DDL reconciled for the table (empty when created by an insert)
    pub ddl: String,
    pub rows: Vec<ColumnMap>,
}

#[derive(Debug, Clone)]
enum FailRule {
    /// Fail every call whose SQL contains the text
    Contains(String),
    /// Fail the nth `insert_row` call (1-based)
    InsertCall(usize),
}

#[derive(Debug, Default)]
struct State {
    tables: BTreeMap<String, MemoryTable>,
    queued_rows: VecDeque<DbResult<Vec<Row>>>,
    queued_scalars: VecDeque<DbResult<Value>>,
    fail_rules: Vec<FailRule>,
    calls: Vec<Call>,
    insert_calls: usize,
    next_id: u64,
    last_error: Option<String>,
    last_query: Option<String>,
    last_insert_id: u64,
    rows_affected: u64,
}

impl State {
    fn fail_for(&self, sql: &str) -> Option<DbError> {
        self.fail_rules.iter().find_map(|rule| match rule {
            FailRule::Contains(text) if sql.contains(text.as_str()) => {
                Some(DbError::execution(format!("injected failure on `{text}`")))
            }
            _ => None,
        })
    }

    /// Record the outcome of an operation in the last_* fields.
    fn settle<T>(&mut self, sql: String, result: DbResult<T>) -> DbResult<T> {
        self.last_query = Some(sql);
        match &result {
            Ok(_) => self.last_error = None,
            Err(err) => self.last_error = Some(err.to_string()),
        }
        result
    }
}

/// A [`SqlExecutor`] that keeps everything in memory.
#[derive(Debug, Default)]
pub struct MemoryExecutor {
    prefix: String,
    state: Mutex<State>,
}

impl MemoryExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `prefix` as the table prefix.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            state: Mutex::default(),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ==================== Scripting ====================

    /// Queue the rows returned by the next `execute_query`.
    pub fn push_rows(&self, rows: Vec<Row>) -> &Self {
        self.state().queued_rows.push_back(Ok(rows));
        self
    }

    /// Queue the value returned by the next `execute_scalar`.
    pub fn push_scalar(&self, value: impl Into<Value>) -> &Self {
        self.state().queued_scalars.push_back(Ok(value.into()));
        self
    }

    /// Make the next `execute_query` fail with `message`.
    pub fn push_query_error(&self, message: impl Into<String>) -> &Self {
        self.state()
            .queued_rows
            .push_back(Err(DbError::execution(message)));
        self
    }

    /// Fail every call whose SQL contains `text`.
    pub fn fail_on(&self, text: impl Into<String>) -> &Self {
        self.state().fail_rules.push(FailRule::Contains(text.into()));
        self
    }

    /// Fail the nth `insert_row` call, counting from 1.
    pub fn fail_insert_call(&self, n: usize) -> &Self {
        self.state().fail_rules.push(FailRule::InsertCall(n));
        self
    }

    /// Drop every failure rule.
    pub fn clear_failures(&self) {
        self.state().fail_rules.clear();
    }

    /// Seed a table with rows, bypassing call recording.
    pub fn seed(&self, table: &str, rows: impl IntoIterator<Item = ColumnMap>) {
        self.state()
            .tables
            .entry(table.to_string())
            .or_default()
            .rows
            .extend(rows);
    }

    // ==================== Inspection ====================

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    /// SQL of every `execute_*` call, in order.
    pub fn statements(&self) -> Vec<String> {
        self.state()
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::Query(sql) | Call::Scalar(sql) | Call::Statement(sql) => Some(sql.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn table(&self, name: &str) -> Option<MemoryTable> {
        self.state().tables.get(name).cloned()
    }

    pub fn rows(&self, table: &str) -> Vec<ColumnMap> {
        self.table(table).map(|t| t.rows).unwrap_or_default()
    }

    pub fn table_names(&self) -> Vec<String> {
        self.state().tables.keys().cloned().collect()
    }

    /// Forget recorded calls. Tables and scripted results stay.
    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }
}

impl SqlExecutor for MemoryExecutor {
    fn execute_query(&self, sql: &str) -> DbResult<Vec<Row>> {
        let mut state = self.state();
        state.calls.push(Call::Query(sql.to_string()));
        let result = match state.fail_for(sql) {
            Some(err) => Err(err),
            None => state.queued_rows.pop_front().unwrap_or_else(|| Ok(Vec::new())),
        };
        if let Ok(rows) = &result {
            state.rows_affected = rows.len() as u64;
        }
        state.settle(sql.to_string(), result)
    }

    fn execute_scalar(&self, sql: &str) -> DbResult<Value> {
        let mut state = self.state();
        state.calls.push(Call::Scalar(sql.to_string()));
        let result = match state.fail_for(sql) {
            Some(err) => Err(err),
            None => match state.queued_scalars.pop_front() {
                Some(queued) => queued,
                None => Ok(count_whole_table(&state, sql).unwrap_or(Value::Int(0))),
            },
        };
        state.settle(sql.to_string(), result)
    }

    fn execute_statement(&self, sql: &str) -> DbResult<u64> {
        let mut state = self.state();
        state.calls.push(Call::Statement(sql.to_string()));
        let result = match state.fail_for(sql) {
            Some(err) => Err(err),
            None => Ok(apply_statement(&mut state, sql)),
        };
        if let Ok(n) = &result {
            state.rows_affected = *n;
        }
        state.settle(sql.to_string(), result)
    }

    fn insert_row(&self, table: &str, data: &ColumnMap) -> DbResult<u64> {
        let mut state = self.state();
        state.calls.push(Call::Insert {
            table: table.to_string(),
            data: data.clone(),
        });
        state.insert_calls += 1;
        let call = state.insert_calls;

        let sql = render_insert(table, data);
        let injected = state.fail_rules.iter().any(|rule| match rule {
            FailRule::InsertCall(n) => *n == call,
            FailRule::Contains(_) => false,
        });
        let failure = if injected {
            Some(DbError::execution(format!("injected failure on insert #{call}")))
        } else {
            state.fail_for(&sql)
        };

        let result = match failure {
            Some(err) => Err(err),
            None => {
                state.next_id += 1;
                let id = state.next_id;
                state
                    .tables
                    .entry(table.to_string())
                    .or_default()
                    .rows
                    .push(data.clone());
                state.last_insert_id = id;
                state.rows_affected = 1;
                Ok(id)
            }
        };
        state.settle(sql, result)
    }

    fn update_rows(
        &self,
        table: &str,
        data: &ColumnMap,
        conditions: &ColumnMap,
    ) -> DbResult<u64> {
        let mut state = self.state();
        state.calls.push(Call::Update {
            table: table.to_string(),
            data: data.clone(),
            conditions: conditions.clone(),
        });

        let assignments: Vec<String> = data
            .iter()
            .map(|(col, v)| format!("{} = {}", quote_ident(col), quote_literal(v)))
            .collect();
        let sql = format!(
            "UPDATE {} SET {}{}",
            quote_ident(table),
            assignments.join(", "),
            render_conditions(conditions)
        );

        let result = match state.fail_for(&sql) {
            Some(err) => Err(err),
            None => {
                let mut changed = 0;
                if let Some(stored) = state.tables.get_mut(table) {
                    for row in stored.rows.iter_mut().filter(|r| matches(r, conditions)) {
                        row.extend(data.iter().map(|(k, v)| (k.clone(), v.clone())));
                        changed += 1;
                    }
                }
                state.rows_affected = changed;
                Ok(changed)
            }
        };
        state.settle(sql, result)
    }

    fn delete_rows(&self, table: &str, conditions: &ColumnMap) -> DbResult<u64> {
        let mut state = self.state();
        state.calls.push(Call::Delete {
            table: table.to_string(),
            conditions: conditions.clone(),
        });
        let sql = format!(
            "DELETE FROM {}{}",
            quote_ident(table),
            render_conditions(conditions)
        );

        let result = match state.fail_for(&sql) {
            Some(err) => Err(err),
            None => {
                let mut removed = 0;
                if let Some(stored) = state.tables.get_mut(table) {
                    let before = stored.rows.len();
                    stored.rows.retain(|r| !matches(r, conditions));
                    removed = (before - stored.rows.len()) as u64;
                }
                state.rows_affected = removed;
                Ok(removed)
            }
        };
        state.settle(sql, result)
    }

    fn reconcile_schema(&self, ddl: &str) -> DbResult<()> {
        let mut state = self.state();
        state.calls.push(Call::Reconcile(ddl.to_string()));
        let result = match state.fail_for(ddl) {
            Some(err) => Err(err),
            None => match created_table_name(ddl) {
                Some(name) => {
                    state.tables.entry(name).or_default().ddl = ddl.to_string();
                    Ok(())
                }
                None => Err(DbError::validation("not a CREATE TABLE statement")),
            },
        };
        state.settle(ddl.to_string(), result)
    }

    fn table_prefix(&self) -> &str {
        &self.prefix
    }

    fn last_error(&self) -> Option<String> {
        self.state().last_error.clone()
    }

    fn last_query(&self) -> Option<String> {
        self.state().last_query.clone()
    }

    fn last_insert_id(&self) -> u64 {
        self.state().last_insert_id
    }

    fn rows_affected(&self) -> u64 {
        self.state().rows_affected
    }
}

fn matches(row: &ColumnMap, conditions: &ColumnMap) -> bool {
    conditions
        .iter()
        .all(|(col, expected)| row.get(col).unwrap_or(&Value::Null) == expected)
}

fn render_insert(table: &str, data: &ColumnMap) -> String {
    let columns: Vec<String> = data.keys().map(|c| quote_ident(c)).collect();
    let values: Vec<String> = data.values().map(quote_literal).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        columns.join(", "),
        values.join(", ")
    )
}

fn render_conditions(conditions: &ColumnMap) -> String {
    if conditions.is_empty() {
        return String::new();
    }
    let parts: Vec<String> = conditions
        .iter()
        .map(|(col, v)| match v {
            Value::Null => format!("{} IS NULL", quote_ident(col)),
            v => format!("{} = {}", quote_ident(col), quote_literal(v)),
        })
        .collect();
    format!(" WHERE {}", parts.join(" AND "))
}

/// Split off leading keywords (case-insensitive) and return the rest.
fn strip_keywords<'a>(sql: &'a str, keywords: &[&str]) -> Option<&'a str> {
    let mut rest = sql.trim_start();
    for keyword in keywords {
        let head = rest.get(..keyword.len())?;
        if !head.eq_ignore_ascii_case(keyword) {
            return None;
        }
        rest = rest[keyword.len()..].trim_start();
    }
    Some(rest)
}

fn bare_name(token: &str) -> String {
    token.trim().trim_matches('`').replace("``", "`")
}

/// First identifier of `rest`, and what follows it.
fn split_name(rest: &str) -> (String, &str) {
    let rest = rest.trim_start();
    let end = if rest.starts_with('`') {
        rest[1..].find('`').map(|i| i + 2).unwrap_or(rest.len())
    } else {
        rest.find(|c: char| c.is_whitespace() || c == '(' || c == ';')
            .unwrap_or(rest.len())
    };
    (bare_name(&rest[..end]), &rest[end..])
}

fn created_table_name(ddl: &str) -> Option<String> {
    let rest = strip_keywords(ddl, &["CREATE", "TABLE"])?;
    let rest = strip_keywords(rest, &["IF", "NOT", "EXISTS"]).unwrap_or(rest);
    let (name, _) = split_name(rest);
    (!name.is_empty()).then_some(name)
}

/// `SELECT COUNT(*) AS numrows FROM t` without further clauses.
fn count_whole_table(state: &State, sql: &str) -> Option<Value> {
    let rest = strip_keywords(sql, &["SELECT", "COUNT(*)", "AS", "numrows", "FROM"])?;
    let (name, tail) = split_name(rest);
    if !tail.trim().is_empty() {
        return None;
    }
    let count = state.tables.get(&name).map_or(0, |t| t.rows.len());
    Some(Value::Int(count as i64))
}

/// Apply the whole-table statements the memory store understands.
fn apply_statement(state: &mut State, sql: &str) -> u64 {
    if let Some(rest) = strip_keywords(sql, &["TRUNCATE", "TABLE"]) {
        let (name, _) = split_name(rest);
        if let Some(table) = state.tables.get_mut(&name) {
            table.rows.clear();
        }
        return 0;
    }
    if let Some(rest) = strip_keywords(sql, &["DELETE", "FROM"]) {
        let (name, tail) = split_name(rest);
        if tail.trim().is_empty() {
            return state
                .tables
                .get_mut(&name)
                .map_or(0, |t| std::mem::take(&mut t.rows).len() as u64);
        }
        return 0;
    }
    if let Some(rest) = strip_keywords(sql, &["DROP", "TABLE"]) {
        let rest = strip_keywords(rest, &["IF", "EXISTS"]).unwrap_or(rest);
        let (name, _) = split_name(rest);
        state.tables.remove(&name);
        return 0;
    }
    if let Some(rest) = strip_keywords(sql, &["ALTER", "TABLE"]) {
        let (from, tail) = split_name(rest);
        if let Some(rest) = strip_keywords(tail, &["RENAME", "TO"]) {
            let (to, _) = split_name(rest);
            if let Some(table) = state.tables.remove(&from) {
                state.tables.insert(to, table);
            }
        }
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, Value)]) -> ColumnMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn insert_update_delete_roundtrip_rows() {
        let ex = MemoryExecutor::new();
        assert_eq!(ex.insert_row("t", &map(&[("id", 1.into()), ("n", "a".into())])).unwrap(), 1);
        assert_eq!(ex.insert_row("t", &map(&[("id", 2.into()), ("n", "b".into())])).unwrap(), 2);
        assert_eq!(ex.last_insert_id(), 2);

        let changed = ex
            .update_rows("t", &map(&[("n", "z".into())]), &map(&[("id", 2.into())]))
            .unwrap();
        assert_eq!(changed, 1);
        assert_eq!(ex.rows("t")[1].get("n"), Some(&Value::from("z")));
        assert_eq!(
            ex.last_query().as_deref(),
            Some("UPDATE `t` SET `n` = 'z' WHERE `id` = 2")
        );

        assert_eq!(ex.delete_rows("t", &map(&[("id", 1.into())])).unwrap(), 1);
        assert_eq!(ex.rows("t").len(), 1);
    }

    #[test]
    fn reconcile_keeps_rows() {
        let ex = MemoryExecutor::new();
        ex.reconcile_schema("CREATE TABLE IF NOT EXISTS `t` (`id` INT)").unwrap();
        ex.insert_row("t", &map(&[("id", 1.into())])).unwrap();
        ex.reconcile_schema("CREATE TABLE `t` (`id` BIGINT)").unwrap();

        let table = ex.table("t").unwrap();
        assert_eq!(table.rows.len(), 1);
        assert!(table.ddl.contains("BIGINT"));
        assert!(ex.reconcile_schema("DROP TABLE t").is_err());
    }

    #[test]
    fn injected_failures_set_last_error() {
        let ex = MemoryExecutor::new();
        ex.fail_insert_call(2);
        assert!(ex.insert_row("t", &map(&[("id", 1.into())])).is_ok());
        assert!(ex.insert_row("t", &map(&[("id", 2.into())])).is_err());
        assert!(ex.last_error().unwrap().contains("insert #2"));
        assert!(ex.insert_row("t", &map(&[("id", 3.into())])).is_ok());
        assert_eq!(ex.last_error(), None);
        assert_eq!(ex.rows("t").len(), 2);

        ex.fail_on("secret");
        assert!(ex.execute_statement("DELETE FROM secret").is_err());
    }

    #[test]
    fn scripted_results_and_whole_table_statements() {
        let ex = MemoryExecutor::new();
        ex.push_rows(vec![Row::new().with("id", 7)]);
        assert_eq!(ex.execute_query("SELECT * FROM t").unwrap().len(), 1);
        assert!(ex.execute_query("SELECT * FROM t").unwrap().is_empty());

        ex.seed("t", [map(&[("id", 1.into())]), map(&[("id", 2.into())])]);
        assert_eq!(
            ex.execute_scalar("SELECT COUNT(*) AS numrows FROM t").unwrap(),
            Value::Int(2)
        );
        assert_eq!(ex.execute_statement("DELETE FROM t").unwrap(), 2);
        assert_eq!(ex.rows_affected(), 2);

        ex.seed("old", [map(&[("id", 1.into())])]);
        ex.execute_statement("ALTER TABLE `old` RENAME TO `new`").unwrap();
        assert!(ex.table("old").is_none());
        assert_eq!(ex.rows("new").len(), 1);
        ex.execute_statement("DROP TABLE IF EXISTS `new`").unwrap();
        assert!(ex.table("new").is_none());
    }
}
