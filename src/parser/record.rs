use geo_types::Geometry;
use geojson::{Feature, GeoJson, JsonObject};
use serde_json::Value;
use std::io::Cursor;
use tracing::debug;

use crate::error::{DatasetError, DatasetResult};

/// One uploaded feature: a geometry plus its property bag
#[derive(Debug, Clone)]
pub struct FeatureRecord {
    pub geometry: Geometry<f64>,
    pub properties: JsonObject,
}

/// A value ready to be bound into an INSERT
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl SqlValue {
    pub fn bind_to(&self, idx: usize, stmt: &mut rusqlite::Statement) -> rusqlite::Result<()> {
        match self {
            SqlValue::Null => stmt.raw_bind_parameter(idx, rusqlite::types::Null)?,
            SqlValue::Integer(i) => stmt.raw_bind_parameter(idx, i)?,
            SqlValue::Real(f) => stmt.raw_bind_parameter(idx, f)?,
            SqlValue::Text(s) => stmt.raw_bind_parameter(idx, s.as_str())?,
        }
        Ok(())
    }
}

/// Parse an uploaded GeoJSON document into feature records.
///
/// Accepts a `FeatureCollection` or a single `Feature`. Every feature must
/// carry a geometry that converts to a `geo_types` geometry.
pub fn parse_feature_collection(bytes: &[u8]) -> DatasetResult<Vec<FeatureRecord>> {
    let geojson = GeoJson::from_reader(Cursor::new(bytes))
        .map_err(|e| DatasetError::invalid(format!("malformed GeoJSON: {}", e)))?;

    let features = match geojson {
        GeoJson::FeatureCollection(collection) => collection.features,
        GeoJson::Feature(feature) => vec![feature],
        GeoJson::Geometry(_) => {
            return Err(DatasetError::invalid(
                "expected a FeatureCollection, found a bare geometry",
            ))
        }
    };

    let records = features
        .into_iter()
        .enumerate()
        .map(|(idx, feature)| feature_to_record(idx, feature))
        .collect::<DatasetResult<Vec<_>>>()?;

    debug!(features = records.len(), "Parsed feature collection");
    Ok(records)
}

fn feature_to_record(idx: usize, feature: Feature) -> DatasetResult<FeatureRecord> {
    let geometry = feature
        .geometry
        .ok_or_else(|| DatasetError::invalid(format!("feature {} has no geometry", idx)))?;

    let geometry: Geometry<f64> = geometry.try_into().map_err(|e: geojson::Error| {
        DatasetError::invalid(format!("feature {} has an unparseable geometry: {}", idx, e))
    })?;

    Ok(FeatureRecord {
        geometry,
        properties: feature.properties.unwrap_or_default(),
    })
}

/// Describe a JSON value's kind for error messages
pub(crate) fn describe_value(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
