//! Column type inference from loosely-typed property values.
//!
//! Numbers and numeric-looking strings (`"7"`, `"-3.25"`) infer as `FLOAT`,
//! booleans as `BOOLEAN`, everything else as `TEXT`. Types form a small
//! join-semilattice: `FLOAT` and `BOOLEAN` are incomparable and both sit
//! below `TEXT`. [`reconcile`] is the join, which makes the final column
//! type independent of feature order.

use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{debug, instrument, trace, warn};

use super::identifier::validate_property_key;
use super::types::{ColumnType, TypeMap};
use crate::error::{DatasetError, DatasetResult};

/// Infer the column type category of a single property value
pub fn infer(value: &Value) -> ColumnType {
    match value {
        Value::Number(_) => ColumnType::Float,
        Value::Bool(_) => ColumnType::Boolean,
        Value::String(s) if parse_float(s).is_some() => ColumnType::Float,
        Value::String(_) | Value::Null | Value::Array(_) | Value::Object(_) => ColumnType::Text,
    }
}

/// Parse a string as a finite float, without trimming
pub(crate) fn parse_float(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|f| f.is_finite())
}

/// Merge two observations of the same property into one column type
pub fn reconcile(a: ColumnType, b: ColumnType) -> ColumnType {
    match (a, b) {
        (a, b) if a == b => a,
        // Float and Boolean have no common numeric representation.
        _ => ColumnType::Text,
    }
}

/// Build the reconciled type map for a collection of property bags.
///
/// Every key is validated as a column name, and keys that only differ in
/// case are rejected since SQLite column names are case-insensitive.
#[instrument(name = "inference.infer_types", skip(properties))]
pub fn infer_types<'a, I>(properties: I) -> DatasetResult<TypeMap>
where
    I: IntoIterator<Item = &'a Map<String, Value>>,
{
    let mut types = TypeMap::new();
    let mut folded: HashMap<String, String> = HashMap::new();

    for (index, props) in properties.into_iter().enumerate() {
        for (key, value) in props {
            let observed = infer(value);

            if let Some(existing) = types.get_mut(key) {
                let resolved = reconcile(*existing, observed);
                if resolved != *existing {
                    warn!(
                        property = key.as_str(),
                        from_type = %existing,
                        to_type = %resolved,
                        feature = index,
                        "Type conflict resolved by widening"
                    );
                    *existing = resolved;
                }
                continue;
            }

            validate_property_key(key)?;
            let lowered = key.to_lowercase();
            if let Some(previous) = folded.get(&lowered) {
                return Err(DatasetError::invalid(format!(
                    "property names '{}' and '{}' differ only in case",
                    previous, key
                )));
            }
            folded.insert(lowered, key.clone());

            trace!(property = key.as_str(), column_type = %observed, "Adding new property");
            types.insert(key.clone(), observed);
        }
    }

    debug!(columns = types.len(), "Type inference complete");
    Ok(types)
}
