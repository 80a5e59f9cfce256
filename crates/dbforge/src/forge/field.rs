//! Column, key and foreign key specifications.

use crate::escape::quote_ident;
use crate::executor::SqlExecutor;
use crate::value::Value;
use serde::Deserialize;
use std::fmt;

/// Type length/precision or ENUM/SET members.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Constraint {
    /// `VARCHAR(100)`
    Int(u32),
    /// Rendered verbatim: `DECIMAL(10,2)`
    Text(String),
    /// Quoted members: `ENUM('draft','publish')`
    List(Vec<String>),
}

impl Constraint {
    fn render(&self, executor: &dyn SqlExecutor) -> String {
        match self {
            Constraint::Int(n) => n.to_string(),
            Constraint::Text(s) => s.trim().to_string(),
            Constraint::List(items) => items
                .iter()
                .map(|item| executor.escape_literal(&Value::Text(item.clone())))
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

impl From<u32> for Constraint {
    fn from(n: u32) -> Self {
        Constraint::Int(n)
    }
}

impl From<&str> for Constraint {
    fn from(s: &str) -> Self {
        Constraint::Text(s.to_string())
    }
}

impl From<String> for Constraint {
    fn from(s: String) -> Self {
        Constraint::Text(s)
    }
}

impl From<Vec<String>> for Constraint {
    fn from(items: Vec<String>) -> Self {
        Constraint::List(items)
    }
}

impl From<&[&str]> for Constraint {
    fn from(items: &[&str]) -> Self {
        Constraint::List(items.iter().map(|s| s.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Constraint {
    fn from(items: [&str; N]) -> Self {
        Constraint::List(items.iter().map(|s| s.to_string()).collect())
    }
}

/// One column definition.
///
/// Columns are `NOT NULL` unless [`nullable`](Self::nullable) is set.
///
/// Deserializes from the shape a schema file uses:
///
/// ```toml
/// { type = "VARCHAR", constraint = 200 }
/// { type = "ENUM", constraint = ["draft", "publish"], default = "draft" }
/// ```
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct FieldSpec {
    #[serde(rename = "type")]
    pub sql_type: String,
    pub constraint: Option<Constraint>,
    pub unsigned: bool,
    pub null: bool,
    pub default: Option<Value>,
    pub auto_increment: bool,
    /// Placement for ADD COLUMN (`AFTER col`)
    pub after: Option<String>,
    /// New name for MODIFY (renders `CHANGE old new ...`)
    pub new_name: Option<String>,
}

impl FieldSpec {
    pub fn new(sql_type: impl Into<String>) -> Self {
        Self {
            sql_type: sql_type.into(),
            ..Self::default()
        }
    }

    pub fn constraint(mut self, constraint: impl Into<Constraint>) -> Self {
        self.constraint = Some(constraint.into());
        self
    }

    pub fn unsigned(mut self) -> Self {
        self.unsigned = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.null = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn after(mut self, column: impl Into<String>) -> Self {
        self.after = Some(column.into());
        self
    }

    pub fn rename_to(mut self, name: impl Into<String>) -> Self {
        self.new_name = Some(name.into());
        self
    }

    /// `` `name` TYPE[(constraint)] [UNSIGNED] NULL|NOT NULL [DEFAULT 'v'] [AUTO_INCREMENT] ``
    pub(crate) fn render(&self, name: &str, executor: &dyn SqlExecutor) -> String {
        let mut sql = quote_ident(name.trim());
        sql.push(' ');
        sql.push_str(&self.sql_type.trim().to_uppercase());
        if let Some(constraint) = &self.constraint {
            sql.push('(');
            sql.push_str(&constraint.render(executor));
            sql.push(')');
        }
        if self.unsigned {
            sql.push_str(" UNSIGNED");
        }
        sql.push_str(if self.null { " NULL" } else { " NOT NULL" });
        match &self.default {
            None => {}
            Some(Value::Null) => sql.push_str(" DEFAULT NULL"),
            Some(value) => {
                sql.push_str(" DEFAULT ");
                sql.push_str(&executor.escape_literal(&Value::Text(value.to_string())));
            }
        }
        if self.auto_increment {
            sql.push_str(" AUTO_INCREMENT");
        }
        sql
    }
}

/// ON DELETE / ON UPDATE behavior of a foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferentialAction {
    #[default]
    Cascade,
    Restrict,
    SetNull,
    SetDefault,
    NoAction,
}

impl ReferentialAction {
    pub fn as_sql(self) -> &'static str {
        match self {
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::Restrict => "RESTRICT",
            ReferentialAction::SetNull => "SET NULL",
            ReferentialAction::SetDefault => "SET DEFAULT",
            ReferentialAction::NoAction => "NO ACTION",
        }
    }
}

impl fmt::Display for ReferentialAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// A foreign key reference. Both actions default to CASCADE.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ForeignKey {
    pub field: String,
    pub reference_table: String,
    pub reference_field: String,
    #[serde(default)]
    pub on_delete: ReferentialAction,
    #[serde(default)]
    pub on_update: ReferentialAction,
}

impl ForeignKey {
    pub fn new(
        field: impl Into<String>,
        reference_table: impl Into<String>,
        reference_field: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            reference_table: reference_table.into(),
            reference_field: reference_field.into(),
            on_delete: ReferentialAction::default(),
            on_update: ReferentialAction::default(),
        }
    }

    pub fn on_delete(mut self, action: ReferentialAction) -> Self {
        self.on_delete = action;
        self
    }

    pub fn on_update(mut self, action: ReferentialAction) -> Self {
        self.on_update = action;
        self
    }
}
