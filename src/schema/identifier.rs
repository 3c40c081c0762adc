//! Identifier rules for names that end up inside generated SQL.
//!
//! Dataset names go through a strict allow-list before they are quoted into
//! DDL, and must stay clear of the index names derived from them. Property keys come straight from uploads, so they are always
//! emitted as quoted identifiers and only screened for values SQLite cannot
//! represent or that would collide with another column.

use once_cell::sync::Lazy;
use std::collections::HashSet;

use super::types::is_system_column;
use crate::error::{DatasetError, DatasetResult};

/// Name of the catalog table
pub const CATALOG_TABLE: &str = "spatial_data";

pub const MAX_TABLE_NAME_LEN: usize = 63;
pub const MAX_PROPERTY_KEY_LEN: usize = 128;

static RESERVED_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "ABORT", "ACTION", "ADD", "AFTER", "ALL", "ALTER", "ALWAYS", "ANALYZE", "AND", "AS",
        "ASC", "ATTACH", "AUTOINCREMENT", "BEFORE", "BEGIN", "BETWEEN", "BY", "CASCADE", "CASE",
        "CAST", "CHECK", "COLLATE", "COLUMN", "COMMIT", "CONFLICT", "CONSTRAINT", "CREATE",
        "CROSS", "CURRENT", "CURRENT_DATE", "CURRENT_TIME", "CURRENT_TIMESTAMP", "DATABASE",
        "DEFAULT", "DEFERRABLE", "DEFERRED", "DELETE", "DESC", "DETACH", "DISTINCT", "DO",
        "DROP", "EACH", "ELSE", "END", "ESCAPE", "EXCEPT", "EXCLUDE", "EXCLUSIVE", "EXISTS",
        "EXPLAIN", "FAIL", "FILTER", "FIRST", "FOLLOWING", "FOR", "FOREIGN", "FROM", "FULL",
        "GENERATED", "GLOB", "GROUP", "GROUPS", "HAVING", "IF", "IGNORE", "IMMEDIATE", "IN",
        "INDEX", "INDEXED", "INITIALLY", "INNER", "INSERT", "INSTEAD", "INTERSECT", "INTO", "IS",
        "ISNULL", "JOIN", "KEY", "LAST", "LEFT", "LIKE", "LIMIT", "MATCH", "MATERIALIZED",
        "NATURAL", "NO", "NOT", "NOTHING", "NOTNULL", "NULL", "NULLS", "OF", "OFFSET", "ON",
        "OR", "ORDER", "OTHERS", "OUTER", "OVER", "PARTITION", "PLAN", "PRAGMA", "PRECEDING",
        "PRIMARY", "QUERY", "RAISE", "RANGE", "RECURSIVE", "REFERENCES", "REGEXP", "REINDEX",
        "RELEASE", "RENAME", "REPLACE", "RESTRICT", "RETURNING", "RIGHT", "ROLLBACK", "ROW",
        "ROWS", "SAVEPOINT", "SELECT", "SET", "TABLE", "TEMP", "TEMPORARY", "THEN", "TIES",
        "TO", "TRANSACTION", "TRIGGER", "UNBOUNDED", "UNION", "UNIQUE", "UPDATE", "USER",
        "USING", "VACUUM", "VALUES", "VIEW", "VIRTUAL", "WHEN", "WHERE", "WINDOW", "WITH",
        "WITHOUT",
    ]
    .into_iter()
    .collect()
});

/// Name of the envelope index kept beside every dataset table
pub fn bbox_index_name(table: &str) -> String {
    format!("idx_{}_bbox", table)
}

/// Whether `name` has the shape of a derived index name
fn is_index_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.len() > "idx__bbox".len() && lower.starts_with("idx_") && lower.ends_with("_bbox")
}

/// Whether `word` is an SQL keyword (case-insensitive)
pub fn is_reserved_word(word: &str) -> bool {
    RESERVED_WORDS.contains(word.to_ascii_uppercase().as_str())
}

/// Validate a dataset name before it is used as a table identifier.
///
/// Accepts `[A-Za-z_][A-Za-z0-9_]*` up to 63 characters that is not a
/// keyword, not in SQLite's `sqlite_` namespace, not shaped like an index
/// name and not the catalog itself.
pub fn validate_table_name(name: &str) -> DatasetResult<()> {
    let mut chars = name.chars();
    let first = chars
        .next()
        .ok_or_else(|| DatasetError::invalid("dataset name is empty"))?;

    if name.len() > MAX_TABLE_NAME_LEN {
        return Err(DatasetError::invalid(format!(
            "dataset name is longer than {} characters",
            MAX_TABLE_NAME_LEN
        )));
    }
    if !(first.is_ascii_alphabetic() || first == '_') {
        return Err(DatasetError::invalid(format!(
            "dataset name '{}' must start with a letter or underscore",
            name
        )));
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(DatasetError::invalid(format!(
            "dataset name '{}' may only contain letters, digits and underscores",
            name
        )));
    }
    if is_reserved_word(name) {
        return Err(DatasetError::invalid(format!(
            "dataset name '{}' is a reserved word",
            name
        )));
    }
    if name.to_ascii_lowercase().starts_with("sqlite_")
        || name.eq_ignore_ascii_case(CATALOG_TABLE)
        || is_index_name(name)
    {
        return Err(DatasetError::invalid(format!(
            "dataset name '{}' is reserved for internal tables",
            name
        )));
    }

    Ok(())
}

/// Validate a property key before it becomes a column name
pub fn validate_property_key(key: &str) -> DatasetResult<()> {
    if key.is_empty() {
        return Err(DatasetError::invalid("property name is empty"));
    }
    if key.len() > MAX_PROPERTY_KEY_LEN {
        return Err(DatasetError::invalid(format!(
            "property name '{}…' is longer than {} bytes",
            key.chars().take(16).collect::<String>(),
            MAX_PROPERTY_KEY_LEN
        )));
    }
    if key.chars().any(char::is_control) {
        return Err(DatasetError::invalid(format!(
            "property name {:?} contains control characters",
            key
        )));
    }
    if is_system_column(key) {
        return Err(DatasetError::invalid(format!(
            "property name '{}' collides with a system column",
            key
        )));
    }
    Ok(())
}

/// Quote an identifier for SQLite (`"name"`, inner quotes doubled)
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
