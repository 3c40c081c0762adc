//! The dataset catalog: one row per ingested dataset.
//!
//! A catalog row and its physical table are created and dropped together
//! by the pipelines in [`crate::writer`]; the helpers here only run single
//! statements against whatever connection or transaction they are given.

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::{DatasetError, DatasetResult};
use crate::schema::{GeometryKind, CATALOG_TABLE};

pub const MAX_COLOR_LEN: usize = 64;

/// Create the catalog table if it does not exist yet
pub fn ensure_catalog(conn: &Connection) -> DatasetResult<()> {
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {CATALOG_TABLE} (
            id INTEGER PRIMARY KEY,
            table_name TEXT NOT NULL UNIQUE COLLATE NOCASE,
            type TEXT NOT NULL CHECK (type IN ('POINT', 'LINESTRING', 'POLYGON')),
            color TEXT NOT NULL,
            coordinate TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            created_by TEXT NOT NULL,
            updated_by TEXT NOT NULL
        )"
    ))?;
    Ok(())
}

/// Longitude/latitude anchor of a dataset, serialized as `[lon, lat]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "[f64; 2]", try_from = "[f64; 2]")]
pub struct Coordinate {
    pub lon: f64,
    pub lat: f64,
}

impl Coordinate {
    pub fn new(lon: f64, lat: f64) -> DatasetResult<Self> {
        if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
            return Err(DatasetError::invalid(format!("longitude {} out of range", lon)));
        }
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(DatasetError::invalid(format!("latitude {} out of range", lat)));
        }
        Ok(Self { lon, lat })
    }
}

impl From<Coordinate> for [f64; 2] {
    fn from(c: Coordinate) -> Self {
        [c.lon, c.lat]
    }
}

impl TryFrom<[f64; 2]> for Coordinate {
    type Error = DatasetError;

    fn try_from([lon, lat]: [f64; 2]) -> Result<Self, Self::Error> {
        Coordinate::new(lon, lat)
    }
}

impl FromStr for Coordinate {
    type Err = DatasetError;

    /// Parse `"lon,lat"`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lon, lat) = s
            .split_once(',')
            .ok_or_else(|| DatasetError::invalid(format!("coordinate '{}' is not 'lon,lat'", s)))?;
        let parse = |part: &str| {
            part.trim()
                .parse::<f64>()
                .map_err(|e| DatasetError::invalid(format!("invalid coordinate '{}': {}", s, e)))
        };
        Coordinate::new(parse(lon)?, parse(lat)?)
    }
}

impl ToSql for Coordinate {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let encoded = serde_json::to_string(self)
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
        Ok(ToSqlOutput::from(encoded))
    }
}

impl FromSql for Coordinate {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        serde_json::from_str(value.as_str()?).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

impl ToSql for GeometryKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for GeometryKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: DatasetError| FromSqlError::Other(Box::new(e)))
    }
}

fn validate_color(color: &str) -> DatasetResult<()> {
    if color.trim().is_empty() || color.len() > MAX_COLOR_LEN {
        return Err(DatasetError::invalid(format!(
            "color must be 1 to {} characters",
            MAX_COLOR_LEN
        )));
    }
    Ok(())
}

/// Attributes supplied when a dataset is first ingested
#[derive(Debug, Clone)]
pub struct NewDataset {
    pub table_name: String,
    pub kind: GeometryKind,
    pub color: String,
    pub coordinate: Option<Coordinate>,
}

impl NewDataset {
    pub fn new(table_name: impl Into<String>, kind: GeometryKind, color: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            kind,
            color: color.into(),
            coordinate: None,
        }
    }

    pub fn with_coordinate(self, coordinate: Coordinate) -> Self {
        Self {
            coordinate: Some(coordinate),
            ..self
        }
    }

    pub(crate) fn validate(&self) -> DatasetResult<()> {
        crate::schema::validate_table_name(&self.table_name)?;
        validate_color(&self.color)
    }
}

/// Changes applied by an edit; `None` leaves the attribute as it is
#[derive(Debug, Clone, Default)]
pub struct DatasetEdit {
    pub table_name: Option<String>,
    pub color: Option<String>,
    pub coordinate: Option<Coordinate>,
}

impl DatasetEdit {
    pub fn rename(table_name: impl Into<String>) -> Self {
        Self {
            table_name: Some(table_name.into()),
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> DatasetResult<()> {
        if let Some(name) = &self.table_name {
            crate::schema::validate_table_name(name)?;
        }
        if let Some(color) = &self.color {
            validate_color(color)?;
        }
        Ok(())
    }
}

/// A catalog row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetEntry {
    pub id: i64,
    pub table_name: String,
    #[serde(rename = "type")]
    pub kind: GeometryKind,
    pub color: String,
    pub coordinate: Option<Coordinate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_by: String,
}

const ENTRY_COLUMNS: &str =
    "id, table_name, type, color, coordinate, created_at, updated_at, created_by, updated_by";

impl DatasetEntry {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            table_name: row.get(1)?,
            kind: row.get(2)?,
            color: row.get(3)?,
            coordinate: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
            created_by: row.get(7)?,
            updated_by: row.get(8)?,
        })
    }
}

/// Whether `name` is taken by a catalog entry or any schema object.
///
/// `except` names the dataset being renamed, which never collides with
/// itself.
pub fn name_taken(conn: &Connection, name: &str, except: Option<&str>) -> DatasetResult<bool> {
    let except = except.unwrap_or("");
    let in_catalog: bool = conn.query_row(
        &format!(
            "SELECT EXISTS (SELECT 1 FROM {CATALOG_TABLE}
             WHERE table_name = ?1 AND table_name <> ?2)"
        ),
        params![name, except],
        |row| row.get(0),
    )?;
    let in_schema: bool = conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM sqlite_master
         WHERE lower(name) = lower(?1) AND lower(name) <> lower(?2))",
        params![name, except],
        |row| row.get(0),
    )?;
    Ok(in_catalog || in_schema)
}

pub fn insert_entry(
    conn: &Connection,
    dataset: &NewDataset,
    user: &str,
    now: DateTime<Utc>,
) -> DatasetResult<i64> {
    conn.execute(
        &format!(
            "INSERT INTO {CATALOG_TABLE}
             (table_name, type, color, coordinate, created_at, updated_at, created_by, updated_by)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5, ?6, ?6)"
        ),
        params![
            dataset.table_name,
            dataset.kind,
            dataset.color,
            dataset.coordinate,
            now,
            user
        ],
    )
    .map_err(|e| match DatasetError::from(e) {
        DatasetError::AlreadyExists(_) => DatasetError::AlreadyExists(dataset.table_name.clone()),
        other => other,
    })?;
    Ok(conn.last_insert_rowid())
}

pub fn find_entry(conn: &Connection, name: &str) -> DatasetResult<Option<DatasetEntry>> {
    let entry = conn
        .query_row(
            &format!("SELECT {ENTRY_COLUMNS} FROM {CATALOG_TABLE} WHERE table_name = ?1"),
            [name],
            DatasetEntry::from_row,
        )
        .optional()?;
    Ok(entry)
}

/// Like [`find_entry`] but absent datasets are an error
pub fn require_entry(conn: &Connection, name: &str) -> DatasetResult<DatasetEntry> {
    find_entry(conn, name)?.ok_or_else(|| DatasetError::NotFound(name.to_string()))
}

pub fn list_entries(conn: &Connection) -> DatasetResult<Vec<DatasetEntry>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ENTRY_COLUMNS} FROM {CATALOG_TABLE} ORDER BY table_name"
    ))?;
    let entries = stmt
        .query_map([], DatasetEntry::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(entries)
}

/// Apply an edit to the catalog row with the given id
pub fn update_entry(
    conn: &Connection,
    id: i64,
    edit: &DatasetEdit,
    user: &str,
    now: DateTime<Utc>,
) -> DatasetResult<()> {
    let updated = conn.execute(
        &format!(
            "UPDATE {CATALOG_TABLE} SET
                updated_at = ?1,
                updated_by = ?2,
                table_name = COALESCE(?3, table_name),
                color = COALESCE(?4, color),
                coordinate = COALESCE(?5, coordinate)
             WHERE id = ?6"
        ),
        params![now, user, edit.table_name, edit.color, edit.coordinate, id],
    )?;
    if updated == 0 {
        return Err(DatasetError::NotFound(format!("catalog id {}", id)));
    }
    Ok(())
}

/// Delete a catalog row; returns whether one existed
pub fn delete_entry(conn: &Connection, name: &str) -> DatasetResult<bool> {
    let deleted = conn.execute(
        &format!("DELETE FROM {CATALOG_TABLE} WHERE table_name = ?1"),
        [name],
    )?;
    Ok(deleted > 0)
}

/// Map-client descriptor for one dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapLayer {
    pub name: String,
    pub coordinate: Option<Coordinate>,
    pub layer: Value,
}

/// Renderer layer type for a geometry kind
pub fn layer_type(kind: GeometryKind) -> &'static str {
    match kind {
        GeometryKind::Point => "circle",
        GeometryKind::LineString => "line",
        GeometryKind::Polygon => "fill",
    }
}

/// Renderer paint properties for a geometry kind and color
pub fn paint(kind: GeometryKind, color: &str) -> Map<String, Value> {
    let paint = match kind {
        GeometryKind::LineString => json!({
            "line-color": color,
            "line-width": 5,
            "line-opacity": 0.8,
        }),
        GeometryKind::Polygon => json!({
            "fill-color": color,
            "fill-opacity": 0.8,
        }),
        GeometryKind::Point => json!({
            "circle-radius": 7,
            "circle-color": color,
            "circle-opacity": 0.8,
            "circle-stroke-width": 1,
        }),
    };
    match paint {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// `river_lines` → `River Lines`
pub fn display_name(table_name: &str) -> String {
    table_name
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

impl MapLayer {
    pub fn from_entry(entry: &DatasetEntry, tile_url_base: &str) -> Self {
        let base = tile_url_base.trim_end_matches('/');
        let layer = json!({
            "id": entry.table_name,
            "source": {
                "type": "vector",
                "tiles": format!("{}/mvt/{}/{{z}}/{{x}}/{{y}}", base, entry.table_name),
            },
            "source-layer": entry.table_name,
            "type": layer_type(entry.kind),
            "paint": paint(entry.kind, &entry.color),
        });
        Self {
            name: display_name(&entry.table_name),
            coordinate: entry.coordinate,
            layer,
        }
    }
}

impl fmt::Display for DatasetEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {})", self.table_name, self.kind, self.color)
    }
}
