//! MySQL literal and identifier escaping.
//!
//! These back the default methods of [`SqlExecutor`](crate::SqlExecutor). A
//! service with access to a live connection may override them (e.g. to honour
//! the connection charset).

use crate::value::Value;

/// Render a value as a MySQL literal.
///
/// Strings are single-quoted with the same characters escaped as
/// `mysql_real_escape_string`; bytes render as a hex literal.
pub fn quote_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Int(v) => v.to_string(),
        Value::Float(v) if v.is_finite() => v.to_string(),
        Value::Float(_) => "NULL".to_string(),
        Value::Text(s) => format!("'{}'", escape_string(s)),
        Value::Bytes(b) => {
            if b.is_empty() {
                return "''".to_string();
            }
            let mut out = String::with_capacity(b.len() * 2 + 3);
            out.push_str("X'");
            for byte in b {
                out.push_str(&format!("{byte:02X}"));
            }
            out.push('\'');
            out
        }
    }
}

/// Escape the body of a single-quoted string literal.
pub fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    for c in s.chars() {
        match c {
            '\0' => out.push_str("\\0"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\x1a' => out.push_str("\\Z"),
            c => out.push(c),
        }
    }
    out
}

/// Neutralize LIKE wildcards so the text only matches itself.
///
/// The backslash is escaped first so a trailing `\` cannot swallow the next
/// wildcard the builder appends.
pub fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for c in s.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Quote one identifier part with backticks, doubling embedded backticks.
pub fn quote_ident_part(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Quote a possibly dotted identifier (`db.table` → `` `db`.`table` ``).
///
/// `*` parts are left bare so `t.*` stays a valid column list.
pub fn quote_ident(name: &str) -> String {
    name.split('.')
        .map(|part| {
            let part = part.trim().trim_matches('`');
            if part == "*" {
                part.to_string()
            } else {
                quote_ident_part(part)
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}
