//! Whole-dataset GeoJSON documents.

use geojson::feature::Id;
use geojson::{Feature, FeatureCollection, JsonObject};
use rusqlite::{Connection, Row};
use serde_json::{Number, Value};
use tracing::{debug, instrument};

use super::select_rows;
use crate::catalog::require_entry;
use crate::error::DatasetResult;
use crate::geometry;
use crate::schema::{table_columns, ColumnType};

/// Read a stored property back as JSON; SQL NULL becomes `null`
fn column_value(row: &Row<'_>, idx: usize, col_type: ColumnType) -> rusqlite::Result<Value> {
    let value = match col_type {
        ColumnType::Float => row
            .get::<_, Option<f64>>(idx)?
            .and_then(Number::from_f64)
            .map(Value::Number),
        ColumnType::Boolean => row.get::<_, Option<bool>>(idx)?.map(Value::Bool),
        ColumnType::Text => row.get::<_, Option<String>>(idx)?.map(Value::String),
    };
    Ok(value.unwrap_or(Value::Null))
}

/// Build a feature collection mirroring every row of a dataset, in row order
#[instrument(name = "dataset.document", skip(conn))]
pub fn read_document(conn: &Connection, name: &str) -> DatasetResult<FeatureCollection> {
    let entry = require_entry(conn, name)?;
    let columns = table_columns(conn, &entry.table_name)?;

    let sql = select_rows(&entry.table_name, &columns, "");
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;

    let mut features = Vec::new();
    while let Some(row) = rows.next()? {
        let id: i64 = row.get(0)?;
        let shape = geometry::decode(row.get(1)?)?;

        let mut properties = JsonObject::new();
        for (offset, column) in columns.iter().enumerate() {
            properties.insert(
                column.name.clone(),
                column_value(row, offset + 2, column.col_type)?,
            );
        }

        features.push(Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geojson::Value::from(&shape))),
            id: Some(Id::Number(id.into())),
            properties: Some(properties),
            foreign_members: None,
        });
    }

    debug!(features = features.len(), "Built dataset document");
    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}
