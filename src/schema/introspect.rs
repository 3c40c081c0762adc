//! Recover the property columns of an existing physical table.

use rusqlite::Connection;

use super::identifier::quote_ident;
use super::types::{is_system_column, ColumnType, PropertyColumn};
use crate::error::{DatasetError, DatasetResult};

/// Property columns of `table` in declaration order, typed from their
/// declared SQL type
pub fn table_columns(conn: &Connection, table: &str) -> DatasetResult<Vec<PropertyColumn>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>("name")?, row.get::<_, String>("type")?))
    })?;

    let mut columns = Vec::new();
    for row in rows {
        let (name, declared) = row?;
        if is_system_column(&name) {
            continue;
        }
        let col_type = ColumnType::from_sql_type(&declared).ok_or_else(|| {
            DatasetError::internal(format!(
                "column '{}' of '{}' has unexpected type '{}'",
                name, table, declared
            ))
        })?;
        columns.push(PropertyColumn { name, col_type });
    }
    Ok(columns)
}
