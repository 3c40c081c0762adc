use crate::schema::{bbox_index_name, quote_ident, PropertyColumn, TypeMap, SYSTEM_COLUMNS};

/// System columns written explicitly on every insert (everything but `id`)
pub const INSERT_SYSTEM_COLUMNS: [&str; 9] = [
    "geom",
    "bbox_min_x",
    "bbox_min_y",
    "bbox_max_x",
    "bbox_max_y",
    "created_at",
    "updated_at",
    "created_by",
    "updated_by",
];

/// Generate CREATE TABLE SQL for a dataset's physical table
pub fn generate_create_table(table: &str, types: &TypeMap) -> String {
    let mut sql = format!("CREATE TABLE {} (\n", quote_ident(table));
    let mut columns = Vec::with_capacity(SYSTEM_COLUMNS.len() + types.len());

    for col in SYSTEM_COLUMNS {
        columns.push(format!("    {} {}", col.name, col.definition));
    }
    for (name, col_type) in types {
        columns.push(format!("    {} {}", quote_ident(name), col_type.sql_type()));
    }

    sql.push_str(&columns.join(",\n"));
    sql.push_str("\n)");

    sql
}

/// Generate the envelope index used by tile reads
pub fn generate_indexes(table: &str) -> Vec<String> {
    vec![format!(
        "CREATE INDEX {} ON {} (bbox_min_x, bbox_max_x, bbox_min_y, bbox_max_y)",
        quote_ident(&bbox_index_name(table)),
        quote_ident(table)
    )]
}

/// Rename a physical table, moving its index names along with it
pub fn generate_rename(old: &str, new: &str) -> Vec<String> {
    let mut statements = vec![
        format!(
            "ALTER TABLE {} RENAME TO {}",
            quote_ident(old),
            quote_ident(new)
        ),
        format!("DROP INDEX IF EXISTS {}", quote_ident(&bbox_index_name(old))),
    ];
    statements.extend(generate_indexes(new));
    statements
}

pub fn generate_drop_table(table: &str) -> String {
    format!("DROP TABLE {}", quote_ident(table))
}

pub fn generate_truncate(table: &str) -> String {
    format!("DELETE FROM {}", quote_ident(table))
}

/// Generate the INSERT for one feature row; placeholders follow
/// [`INSERT_SYSTEM_COLUMNS`] then `properties` in order
pub fn generate_insert(table: &str, properties: &[PropertyColumn]) -> String {
    let columns: Vec<String> = INSERT_SYSTEM_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain(properties.iter().map(|p| quote_ident(&p.name)))
        .collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();

    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        columns.join(", "),
        placeholders.join(", ")
    )
}
