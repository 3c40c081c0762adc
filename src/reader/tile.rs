//! Mapbox Vector Tile generation.
//!
//! Rows are prefiltered by their stored envelope, projected to Web Mercator,
//! clipped to the buffered tile, rewound for MVT and scaled into tile-local
//! coordinates.

use geo_types::Geometry;
use geozero::mvt::{tile, Message, Tile};
use geozero::ToMvt;
use rusqlite::{params, Connection, Row};
use std::collections::HashMap;
use tracing::{debug, instrument, trace};

use super::select_rows;
use crate::catalog::require_entry;
use crate::error::{DatasetError, DatasetResult};
use crate::geometry::clip::clip;
use crate::geometry::mercator::{envelope_to_lonlat, to_mercator, TileCoord};
use crate::geometry::orient::orient;
use crate::geometry::{self, map_coords};
use crate::schema::{table_columns, ColumnType, PropertyColumn};

/// Tile-local coordinate range
pub const EXTENT: u32 = 4096;

/// Extra tile-local units kept around each tile edge
pub const BUFFER: u32 = 256;

const MVT_VERSION: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum TagValue {
    Double(u64),
    Bool(bool),
    String(String),
}

impl TagValue {
    fn to_mvt(&self) -> tile::Value {
        match self {
            TagValue::Double(bits) => tile::Value {
                double_value: Some(f64::from_bits(*bits)),
                ..Default::default()
            },
            TagValue::Bool(b) => tile::Value {
                bool_value: Some(*b),
                ..Default::default()
            },
            TagValue::String(s) => tile::Value {
                string_value: Some(s.clone()),
                ..Default::default()
            },
        }
    }
}

/// Interned keys and values of one layer
#[derive(Default)]
struct LayerTags {
    keys: Vec<String>,
    key_index: HashMap<String, u32>,
    values: Vec<tile::Value>,
    value_index: HashMap<TagValue, u32>,
}

impl LayerTags {
    fn key(&mut self, key: &str) -> u32 {
        if let Some(idx) = self.key_index.get(key) {
            return *idx;
        }
        let idx = self.keys.len() as u32;
        self.keys.push(key.to_string());
        self.key_index.insert(key.to_string(), idx);
        idx
    }

    fn value(&mut self, value: TagValue) -> u32 {
        if let Some(idx) = self.value_index.get(&value) {
            return *idx;
        }
        let idx = self.values.len() as u32;
        self.values.push(value.to_mvt());
        self.value_index.insert(value, idx);
        idx
    }
}

fn tag_value(row: &Row<'_>, idx: usize, col_type: ColumnType) -> rusqlite::Result<Option<TagValue>> {
    Ok(match col_type {
        ColumnType::Float => row.get::<_, Option<f64>>(idx)?.map(|f| TagValue::Double(f.to_bits())),
        ColumnType::Boolean => row.get::<_, Option<bool>>(idx)?.map(TagValue::Bool),
        ColumnType::Text => row.get::<_, Option<String>>(idx)?.map(TagValue::String),
    })
}

/// Split collections into parts MVT can carry
fn flatten(geometry: Geometry<f64>, out: &mut Vec<Geometry<f64>>) {
    match geometry {
        Geometry::GeometryCollection(gc) => gc.0.into_iter().for_each(|g| flatten(g, out)),
        other => out.push(other),
    }
}

fn tags(
    row: &Row<'_>,
    columns: &[PropertyColumn],
    layer_tags: &mut LayerTags,
) -> rusqlite::Result<Vec<u32>> {
    let mut tags = Vec::with_capacity(columns.len() * 2);
    for (offset, column) in columns.iter().enumerate() {
        if let Some(value) = tag_value(row, offset + 2, column.col_type)? {
            tags.push(layer_tags.key(&column.name));
            tags.push(layer_tags.value(value));
        }
    }
    Ok(tags)
}

/// Render one tile of a dataset; an empty tile encodes to zero bytes
#[instrument(name = "dataset.tile", skip(conn), fields(z = coord.z, x = coord.x, y = coord.y))]
pub fn read_tile(conn: &Connection, name: &str, coord: TileCoord) -> DatasetResult<Vec<u8>> {
    let entry = require_entry(conn, name)?;
    let columns = table_columns(conn, &entry.table_name)?;

    let bounds = coord.bounds();
    let clip_box = coord.buffered_bounds(EXTENT, BUFFER);
    let filter = envelope_to_lonlat(&clip_box);

    let sql = select_rows(
        &entry.table_name,
        &columns,
        "WHERE bbox_max_x >= ?1 AND bbox_min_x <= ?2 AND bbox_max_y >= ?3 AND bbox_min_y <= ?4",
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params![filter.min_x, filter.max_x, filter.min_y, filter.max_y])?;

    let mut layer_tags = LayerTags::default();
    let mut features = Vec::new();
    let mut candidates = 0usize;

    while let Some(row) = rows.next()? {
        candidates += 1;
        let id: i64 = row.get(0)?;
        let projected = map_coords(&geometry::decode(row.get(1)?)?, &to_mercator);
        let Some(clipped) = clip(&projected, &clip_box) else {
            trace!(id, "Row envelope overlaps but geometry does not");
            continue;
        };

        let feature_tags = tags(row, &columns, &mut layer_tags)?;
        let mut parts = Vec::new();
        flatten(orient(clipped), &mut parts);

        for part in parts {
            let mut feature = part
                .to_mvt(EXTENT, bounds.min_x, bounds.min_y, bounds.max_x, bounds.max_y)
                .map_err(|e| DatasetError::internal(format!("cannot encode row {}: {}", id, e)))?;
            feature.id = u64::try_from(id).ok();
            feature.tags = feature_tags.clone();
            features.push(feature);
        }
    }

    debug!(candidates, features = features.len(), "Rendered tile");
    if features.is_empty() {
        return Ok(Vec::new());
    }

    let layer = tile::Layer {
        version: MVT_VERSION,
        name: entry.table_name,
        features,
        keys: layer_tags.keys,
        values: layer_tags.values,
        extent: Some(EXTENT),
    };
    Ok(Tile {
        layers: vec![layer],
    }
    .encode_to_vec())
}
