use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::DatasetError;

/// Spatial reference of every stored geometry (longitude/latitude degrees)
pub const SRID: i32 = 4326;

/// Column type category for a property column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnType {
    Float,
    Boolean,
    Text,
}

impl ColumnType {
    /// Declared SQL type used in generated DDL
    pub const fn sql_type(self) -> &'static str {
        match self {
            ColumnType::Float => "REAL",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Text => "TEXT",
        }
    }

    /// Recover the category from a declared column type (`PRAGMA table_info`)
    pub fn from_sql_type(declared: &str) -> Option<Self> {
        match declared.trim().to_ascii_uppercase().as_str() {
            "REAL" | "FLOAT" | "DOUBLE PRECISION" => Some(ColumnType::Float),
            "BOOLEAN" => Some(ColumnType::Boolean),
            "TEXT" => Some(ColumnType::Text),
            _ => None,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Float => write!(f, "FLOAT"),
            ColumnType::Boolean => write!(f, "BOOLEAN"),
            ColumnType::Text => write!(f, "TEXT"),
        }
    }
}

/// Geometry kind declared for a dataset; drives map styling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GeometryKind {
    Point,
    LineString,
    Polygon,
}

impl GeometryKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            GeometryKind::Point => "POINT",
            GeometryKind::LineString => "LINESTRING",
            GeometryKind::Polygon => "POLYGON",
        }
    }
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GeometryKind {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "POINT" => Ok(GeometryKind::Point),
            "LINESTRING" => Ok(GeometryKind::LineString),
            "POLYGON" => Ok(GeometryKind::Polygon),
            other => Err(DatasetError::invalid(format!(
                "unknown geometry kind '{}' (expected POINT, LINESTRING or POLYGON)",
                other
            ))),
        }
    }
}

/// Fixed columns present in every physical feature table, in DDL order
pub const SYSTEM_COLUMNS: &[SystemColumn] = &[
    SystemColumn::new("id", "INTEGER PRIMARY KEY AUTOINCREMENT"),
    SystemColumn::new("geom", "BLOB NOT NULL"),
    SystemColumn::new("bbox_min_x", "REAL NOT NULL"),
    SystemColumn::new("bbox_min_y", "REAL NOT NULL"),
    SystemColumn::new("bbox_max_x", "REAL NOT NULL"),
    SystemColumn::new("bbox_max_y", "REAL NOT NULL"),
    SystemColumn::new("created_at", "TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP"),
    SystemColumn::new("updated_at", "TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP"),
    SystemColumn::new("created_by", "TEXT"),
    SystemColumn::new("updated_by", "TEXT"),
];

/// System column definition
#[derive(Debug, Clone, Copy)]
pub struct SystemColumn {
    pub name: &'static str,
    pub definition: &'static str,
}

impl SystemColumn {
    pub const fn new(name: &'static str, definition: &'static str) -> Self {
        Self { name, definition }
    }
}

/// Whether `name` collides (case-insensitively) with a system column
pub fn is_system_column(name: &str) -> bool {
    SYSTEM_COLUMNS
        .iter()
        .any(|col| col.name.eq_ignore_ascii_case(name))
}

/// Property name to column type, iterated in name order.
///
/// The ordering is what keeps generated DDL and INSERT column lists
/// consistent with each other.
pub type TypeMap = BTreeMap<String, ColumnType>;

/// A property column of an existing physical table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyColumn {
    pub name: String,
    pub col_type: ColumnType,
}
