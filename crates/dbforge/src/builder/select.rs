use super::clause::{Clause, Direction, LikeSide, split_key};
use super::QueryBuilder;
use crate::exec::{Statement, run};
use crate::monitor::QueryOutcome;
use crate::result::ResultSet;
use crate::value::{IntoOperand, Operand, Value};

impl QueryBuilder {
    // ==================== SELECT list ====================

    /// Append to the SELECT list (`"ID, post_title"` or a single expression).
    pub fn select(&mut self, cols: &str) -> &mut Self {
        let cols = cols.trim();
        if !cols.is_empty() {
            self.select.push(cols.to_string());
        }
        self
    }

    /// Append several SELECT columns.
    pub fn select_cols(&mut self, cols: &[&str]) -> &mut Self {
        for col in cols {
            self.select(col);
        }
        self
    }

    /// `SELECT MAX(column) AS alias`. An empty alias reuses the column name.
    pub fn select_max(&mut self, column: &str, alias: &str) -> &mut Self {
        self.select_aggregate("MAX", column, alias)
    }

    /// `SELECT MIN(column) AS alias`.
    pub fn select_min(&mut self, column: &str, alias: &str) -> &mut Self {
        self.select_aggregate("MIN", column, alias)
    }

    /// `SELECT AVG(column) AS alias`.
    pub fn select_avg(&mut self, column: &str, alias: &str) -> &mut Self {
        self.select_aggregate("AVG", column, alias)
    }

    /// `SELECT SUM(column) AS alias`.
    pub fn select_sum(&mut self, column: &str, alias: &str) -> &mut Self {
        self.select_aggregate("SUM", column, alias)
    }

    fn select_aggregate(&mut self, func: &str, column: &str, alias: &str) -> &mut Self {
        let column = column.trim();
        let alias = match alias.trim() {
            "" => column,
            a => a,
        };
        self.select.push(format!("{func}({column}) AS {alias}"));
        self
    }

    pub fn distinct(&mut self) -> &mut Self {
        self.distinct = true;
        self
    }

    // ==================== FROM / JOIN ====================

    /// Set the FROM table (prefixed). An alias may follow: `"posts p"`.
    pub fn from(&mut self, table: &str) -> &mut Self {
        self.from = Some(self.prefixed(table));
        self
    }

    /// Add a JOIN. `kind` is upper-cased and trimmed (`"left"` → `LEFT JOIN`);
    /// an empty kind renders a plain `JOIN`. The kind is not validated.
    pub fn join(&mut self, table: &str, on: &str, kind: &str) -> &mut Self {
        let kind = kind.trim().to_uppercase();
        let head = if kind.is_empty() {
            "JOIN".to_string()
        } else {
            format!("{kind} JOIN")
        };
        let table = self.prefixed(table);
        self.joins.push(format!("{head} {table} ON {on}"));
        self
    }

    /// Add INNER JOIN.
    pub fn inner_join(&mut self, table: &str, on: &str) -> &mut Self {
        self.join(table, on, "INNER")
    }

    /// Add LEFT JOIN.
    pub fn left_join(&mut self, table: &str, on: &str) -> &mut Self {
        self.join(table, on, "LEFT")
    }

    /// Add RIGHT JOIN.
    pub fn right_join(&mut self, table: &str, on: &str) -> &mut Self {
        self.join(table, on, "RIGHT")
    }

    // ==================== WHERE ====================

    /// Render `column op operand`. Escaped equalities also yield a binding.
    fn condition(&self, key: &str, operand: Operand) -> Clause {
        let (column, op) = split_key(key);
        match operand {
            Operand::Value(Value::Null) if matches!(op, "=" | "!=" | "<>") => {
                let test = if op == "=" { "IS NULL" } else { "IS NOT NULL" };
                Clause {
                    sql: format!("{column} {test}"),
                    binding: (op == "=").then(|| (column.to_string(), Value::Null)),
                }
            }
            Operand::Value(value) => Clause {
                sql: format!("{column} {op} {}", self.executor.escape_literal(&value)),
                binding: (op == "=").then(|| (column.to_string(), value)),
            },
            Operand::Raw(sql) => Clause {
                sql: format!("{column} {op} {sql}"),
                binding: None,
            },
        }
    }

    /// Add an AND condition. The key may end in an operator (`"age >"`);
    /// the value is escaped unless it is a [`raw`](crate::raw) fragment.
    pub fn where_(&mut self, key: &str, value: impl IntoOperand) -> &mut Self {
        let clause = self.condition(key, value.into_operand());
        self.wheres.push(clause);
        self
    }

    /// Add several AND conditions, in iteration order.
    pub fn where_map<I, K, V>(&mut self, pairs: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: IntoOperand,
    {
        for (key, value) in pairs {
            self.where_(key.as_ref(), value);
        }
        self
    }

    /// Add an OR condition.
    pub fn or_where(&mut self, key: &str, value: impl IntoOperand) -> &mut Self {
        let clause = self.condition(key, value.into_operand());
        self.or_wheres.push(clause.sql);
        self
    }

    /// Add several OR conditions, in iteration order.
    pub fn or_where_map<I, K, V>(&mut self, pairs: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: IntoOperand,
    {
        for (key, value) in pairs {
            self.or_where(key.as_ref(), value);
        }
        self
    }

    fn in_list<I, V>(&self, values: I) -> Vec<String>
    where
        I: IntoIterator<Item = V>,
        V: IntoOperand,
    {
        values
            .into_iter()
            .map(|v| match v.into_operand() {
                Operand::Value(value) => self.executor.escape_literal(&value),
                Operand::Raw(sql) => sql,
            })
            .collect()
    }

    /// Add `column IN (...)`. An empty list leaves the builder unchanged.
    pub fn where_in<I, V>(&mut self, column: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: IntoOperand,
    {
        let list = self.in_list(values);
        if !list.is_empty() {
            self.where_in
                .push(format!("{} IN ({})", column.trim(), list.join(", ")));
        }
        self
    }

    /// Add `column NOT IN (...)`. An empty list leaves the builder unchanged.
    pub fn where_not_in<I, V>(&mut self, column: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: IntoOperand,
    {
        let list = self.in_list(values);
        if !list.is_empty() {
            self.where_not_in
                .push(format!("{} NOT IN ({})", column.trim(), list.join(", ")));
        }
        self
    }

    // ==================== LIKE ====================

    /// `column <operator> 'pattern'` with `body` taken as-is.
    fn like_clause(&self, column: &str, body: &str, side: LikeSide, operator: &str) -> String {
        let pattern = self.executor.escape_literal(&Value::Text(side.wrap(body)));
        format!("{} {operator} {pattern}", column.trim())
    }

    /// Like [`like_clause`](Self::like_clause), with `%` and `_` in `text` neutralized.
    fn literal_like(&self, column: &str, text: &str, side: LikeSide, operator: &str) -> String {
        let body = self.executor.escape_like_wildcards(text);
        self.like_clause(column, &body, side, operator)
    }

    /// AND `column LIKE pattern`. `%` and `_` in `text` match literally.
    pub fn like(&mut self, column: &str, text: &str, side: LikeSide) -> &mut Self {
        let clause = self.literal_like(column, text, side, "LIKE");
        self.likes.push(clause);
        self
    }

    /// AND `column NOT LIKE pattern`.
    pub fn not_like(&mut self, column: &str, text: &str, side: LikeSide) -> &mut Self {
        let clause = self.literal_like(column, text, side, "NOT LIKE");
        self.likes.push(clause);
        self
    }

    /// AND LIKE keeping the caller's own wildcards in `text`.
    ///
    /// The pattern is still quoted; only wildcard neutralization is skipped.
    pub fn like_raw(&mut self, column: &str, text: &str, side: LikeSide) -> &mut Self {
        let clause = self.like_clause(column, text, side, "LIKE");
        self.likes.push(clause);
        self
    }

    /// OR `column LIKE pattern`.
    pub fn or_like(&mut self, column: &str, text: &str, side: LikeSide) -> &mut Self {
        let clause = self.literal_like(column, text, side, "LIKE");
        self.or_likes.push(clause);
        self
    }

    /// OR `column NOT LIKE pattern`.
    pub fn or_not_like(&mut self, column: &str, text: &str, side: LikeSide) -> &mut Self {
        let clause = self.literal_like(column, text, side, "NOT LIKE");
        self.or_likes.push(clause);
        self
    }

    // ==================== GROUP / HAVING / ORDER ====================

    /// Append GROUP BY columns (comma separated).
    pub fn group_by(&mut self, cols: &str) -> &mut Self {
        self.group_by.extend(
            cols.split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string),
        );
        self
    }

    /// Add a HAVING condition (AND-joined). Keys accept operators like `where_`.
    pub fn having(&mut self, key: &str, value: impl IntoOperand) -> &mut Self {
        let clause = self.condition(key, value.into_operand());
        self.having.push(clause.sql);
        self
    }

    pub fn having_map<I, K, V>(&mut self, pairs: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: IntoOperand,
    {
        for (key, value) in pairs {
            self.having(key.as_ref(), value);
        }
        self
    }

    /// Add ORDER BY. Anything other than `"DESC"` (any case) sorts ascending.
    pub fn order_by(&mut self, expr: &str, direction: &str) -> &mut Self {
        self.order_by
            .push((expr.trim().to_string(), Direction::parse(direction)));
        self
    }

    /// Add ORDER BY column ASC.
    pub fn order_by_asc(&mut self, expr: &str) -> &mut Self {
        self.order_by.push((expr.trim().to_string(), Direction::Asc));
        self
    }

    /// Add ORDER BY column DESC.
    pub fn order_by_desc(&mut self, expr: &str) -> &mut Self {
        self.order_by.push((expr.trim().to_string(), Direction::Desc));
        self
    }

    // ==================== Pagination ====================

    pub fn limit(&mut self, limit: u64) -> &mut Self {
        self.limit = Some(limit);
        self
    }

    /// OFFSET only renders together with a LIMIT.
    pub fn offset(&mut self, offset: u64) -> &mut Self {
        self.offset = Some(offset);
        self
    }

    /// Pagination helper.
    ///
    /// `page` is 1-based (clamped to >= 1).
    /// `per_page` is clamped to >= 1.
    pub fn paginate(&mut self, page: u64, per_page: u64) -> &mut Self {
        let page = page.max(1);
        let size = per_page.max(1);
        self.limit = Some(size);
        self.offset = Some((page - 1).saturating_mul(size));
        self
    }

    // ==================== SET ====================

    /// Set a column value for the next insert/update.
    pub fn set(&mut self, column: &str, value: impl IntoOperand) -> &mut Self {
        self.set
            .insert(column.trim().to_string(), value.into_operand());
        self
    }

    pub fn set_map<I, K, V>(&mut self, pairs: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: IntoOperand,
    {
        for (key, value) in pairs {
            self.set(key.as_ref(), value);
        }
        self
    }

    // ==================== SQL build ====================

    /// The combined WHERE condition, without the keyword.
    ///
    /// Shape: `(and AND ...)`, `(or OR ...)`, or `(and AND ...) OR (or OR ...)`.
    pub(crate) fn where_clause(&self) -> Option<String> {
        let and_group: Vec<&str> = self
            .wheres
            .iter()
            .map(|c| c.sql.as_str())
            .chain(self.where_in.iter().map(String::as_str))
            .chain(self.where_not_in.iter().map(String::as_str))
            .chain(self.likes.iter().map(String::as_str))
            .collect();
        let or_group: Vec<&str> = self
            .or_wheres
            .iter()
            .chain(self.or_likes.iter())
            .map(String::as_str)
            .collect();

        let mut out = String::new();
        if !and_group.is_empty() {
            out.push('(');
            out.push_str(&and_group.join(" AND "));
            out.push(')');
        }
        if !or_group.is_empty() {
            if !out.is_empty() {
                out.push_str(" OR ");
            }
            out.push('(');
            out.push_str(&or_group.join(" OR "));
            out.push(')');
        }
        (!out.is_empty()).then_some(out)
    }

    /// FROM, JOIN, WHERE, GROUP BY and HAVING.
    fn push_body(&self, sql: &mut String) {
        if let Some(from) = &self.from {
            sql.push_str(" FROM ");
            sql.push_str(from);
        }

        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join);
        }

        if let Some(cond) = self.where_clause() {
            sql.push_str(" WHERE ");
            sql.push_str(&cond);
        }

        if !self.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.group_by.join(", "));
        }

        if !self.having.is_empty() {
            sql.push_str(" HAVING ");
            sql.push_str(&self.having.join(" AND "));
        }
    }

    fn build_query(&self) -> String {
        let mut sql = String::from("SELECT ");
        if self.distinct {
            sql.push_str("DISTINCT ");
        }
        if self.select.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&self.select.join(", "));
        }

        self.push_body(&mut sql);

        if !self.order_by.is_empty() {
            let terms: Vec<String> = self
                .order_by
                .iter()
                .map(|(expr, dir)| format!("{expr} {dir}"))
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&terms.join(", "));
        }

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
            if let Some(offset) = self.offset {
                sql.push_str(&format!(" OFFSET {offset}"));
            }
        }

        sql
    }

    fn build_count_query(&self) -> String {
        if self.distinct || !self.group_by.is_empty() || !self.having.is_empty() {
            let mut inner = String::from("SELECT ");
            if self.distinct {
                inner.push_str("DISTINCT ");
            }
            if self.select.is_empty() {
                inner.push('*');
            } else {
                inner.push_str(&self.select.join(", "));
            }
            self.push_body(&mut inner);
            format!("SELECT COUNT(*) AS numrows FROM ({inner}) AS dbforge_count")
        } else {
            let mut sql = String::from("SELECT COUNT(*) AS numrows");
            self.push_body(&mut sql);
            sql
        }
    }

    /// The SELECT the current state renders to. Does not reset.
    pub fn to_sql(&self) -> String {
        self.build_query()
    }

    /// The COUNT query the current state renders to. Does not reset.
    pub fn to_count_sql(&self) -> String {
        self.build_count_query()
    }

    // ==================== Execution ====================

    /// Render, execute and reset. Failures yield an empty result set.
    pub fn get(&mut self) -> ResultSet {
        let sql = self.build_query();
        self.last_query = Some(sql.clone());
        let executed = run(
            &*self.executor,
            &self.config,
            Statement::Rendered(&sql),
            |ex| ex.execute_query(&sql),
            |rows| QueryOutcome::Rows(rows.len()),
        );
        self.reset();
        match executed.result {
            Ok(rows) => {
                self.last_error = None;
                ResultSet::new(rows)
            }
            Err(err) => {
                self.record_failure(&err);
                ResultSet::empty()
            }
        }
    }

    /// `from(table)` then `get()`.
    pub fn get_from(&mut self, table: &str) -> ResultSet {
        self.from(table);
        self.get()
    }

    /// `from(table)`, optional limit/offset, then `get()`.
    pub fn get_limit(&mut self, table: &str, limit: Option<u64>, offset: Option<u64>) -> ResultSet {
        self.get_where(table, Vec::<(&str, Value)>::new(), limit, offset)
    }

    /// `from(table)`, `where_map(conditions)`, optional limit/offset, then `get()`.
    pub fn get_where<I, K, V>(
        &mut self,
        table: &str,
        conditions: I,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> ResultSet
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: IntoOperand,
    {
        self.from(table);
        self.where_map(conditions);
        if let Some(limit) = limit {
            self.limit(limit);
        }
        if let Some(offset) = offset {
            self.offset(offset);
        }
        self.get()
    }

    /// Count rows matching the accumulated state, then reset. 0 on failure.
    pub fn count_all_results(&mut self) -> u64 {
        let sql = self.build_count_query();
        self.last_query = Some(sql.clone());
        let executed = run(
            &*self.executor,
            &self.config,
            Statement::Rendered(&sql),
            |ex| ex.execute_scalar(&sql),
            |_| QueryOutcome::Rows(1),
        );
        self.reset();
        match executed.result {
            Ok(value) => {
                self.last_error = None;
                value.as_i64().and_then(|n| u64::try_from(n).ok()).unwrap_or(0)
            }
            Err(err) => {
                self.record_failure(&err);
                0
            }
        }
    }

    /// `from(table)` then `count_all_results()`.
    pub fn count_all_results_from(&mut self, table: &str) -> u64 {
        self.from(table);
        self.count_all_results()
    }

    /// Count every row of `table`, ignoring (and keeping) accumulated state.
    pub fn count_all(&mut self, table: &str) -> u64 {
        let sql = format!("SELECT COUNT(*) AS numrows FROM {}", self.prefixed(table));
        self.last_query = Some(sql.clone());
        let executed = run(
            &*self.executor,
            &self.config,
            Statement::Rendered(&sql),
            |ex| ex.execute_scalar(&sql),
            |_| QueryOutcome::Rows(1),
        );
        match executed.result {
            Ok(value) => {
                self.last_error = None;
                value.as_i64().and_then(|n| u64::try_from(n).ok()).unwrap_or(0)
            }
            Err(err) => {
                self.record_failure(&err);
                0
            }
        }
    }
}
