//! Clause fragments and the small enums the builder accepts.

use crate::value::{ColumnMap, Value};
use std::fmt;

/// Comparison operators recognised at the end of a condition key
/// (`"age >"`, `"status !="`). Longest first so `<=` wins over `<`.
const KEY_OPERATORS: [&str; 7] = ["<=", ">=", "!=", "<>", "=", "<", ">"];

/// Split `"column op"` into the column and its operator (default `=`).
pub(crate) fn split_key(key: &str) -> (&str, &str) {
    let key = key.trim();
    for op in KEY_OPERATORS {
        if let Some(column) = key.strip_suffix(op) {
            let column = column.trim_end();
            if !column.is_empty() {
                return (column, op);
            }
        }
    }
    (key, "=")
}

/// A rendered WHERE fragment of the AND-group.
///
/// `binding` is set only for escaped equality conditions; it is what the
/// structured update/delete path hands to the executor.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Clause {
    pub sql: String,
    pub binding: Option<(String, Value)>,
}

/// Rebuild a condition map from rendered `column = value` fragments.
///
/// This is the historical behavior behind [`WhereMode::Legacy`](crate::WhereMode::Legacy):
/// every fragment is split on `" = "`, and anything that doesn't yield exactly
/// two parts (other operators, IN lists, values containing `" = "`) is
/// silently dropped. Quote characters are stripped from the value.
pub(crate) fn parse_legacy_where<'a>(fragments: impl IntoIterator<Item = &'a str>) -> ColumnMap {
    let mut map = ColumnMap::new();
    for fragment in fragments.into_iter().filter(|f| is_legacy_equality(f)) {
        let Some((column, text)) = fragment.split_once(" = ") else {
            continue;
        };
        let column = column.trim();
        let text = text.trim().replace(['\'', '"'], "");
        let value = match text.parse::<i64>() {
            Ok(n) => Value::Int(n),
            Err(_) => Value::Text(text),
        };
        map.insert(column.to_string(), value);
    }
    map
}

/// True for fragments the legacy re-parse keeps: exactly one `" = "`.
pub(crate) fn is_legacy_equality(fragment: &str) -> bool {
    fragment.matches(" = ").count() == 1
}

/// Where the `%` wildcards go around a LIKE match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LikeSide {
    /// `%match`
    Before,
    /// `match%`
    After,
    /// `%match%`
    #[default]
    Both,
}

impl LikeSide {
    /// Lenient parse: `"before"`, `"after"`, anything else is `Both`.
    pub fn parse(side: &str) -> Self {
        match side.trim().to_ascii_lowercase().as_str() {
            "before" | "left" => LikeSide::Before,
            "after" | "right" => LikeSide::After,
            _ => LikeSide::Both,
        }
    }

    pub(crate) fn wrap(self, body: &str) -> String {
        match self {
            LikeSide::Before => format!("%{body}"),
            LikeSide::After => format!("{body}%"),
            LikeSide::Both => format!("%{body}%"),
        }
    }
}

/// ORDER BY direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    /// Lenient parse: `"desc"` in any case is `Desc`, everything else `Asc`.
    pub fn parse(direction: &str) -> Self {
        if direction.trim().eq_ignore_ascii_case("DESC") {
            Direction::Desc
        } else {
            Direction::Asc
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl From<&str> for Direction {
    fn from(direction: &str) -> Self {
        Direction::parse(direction)
    }
}
