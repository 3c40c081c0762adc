//! Conversion of raw property values into their column's representation.

use serde_json::Value;
use thiserror::Error;

use super::record::{describe_value, SqlValue};
use crate::schema::{parse_float, ColumnType};

/// A value that does not fit its reconciled column type
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind} value {value} is not a valid {target}")]
pub struct CoercionFailure {
    pub kind: &'static str,
    pub value: String,
    pub target: ColumnType,
}

impl CoercionFailure {
    fn new(value: &Value, target: ColumnType) -> Self {
        Self {
            kind: describe_value(value),
            value: value.to_string(),
            target,
        }
    }
}

/// Convert `value` into the storage representation of `target`.
///
/// `null` is stored as SQL NULL for every column type.
pub fn coerce(value: &Value, target: ColumnType) -> Result<SqlValue, CoercionFailure> {
    if value.is_null() {
        return Ok(SqlValue::Null);
    }

    match target {
        ColumnType::Float => match value {
            Value::Number(n) => n
                .as_f64()
                .map(SqlValue::Real)
                .ok_or_else(|| CoercionFailure::new(value, target)),
            Value::String(s) => parse_float(s)
                .map(SqlValue::Real)
                .ok_or_else(|| CoercionFailure::new(value, target)),
            _ => Err(CoercionFailure::new(value, target)),
        },
        ColumnType::Boolean => match value {
            Value::Bool(b) => Ok(SqlValue::Integer(i64::from(*b))),
            Value::String(s) => parse_bool(s)
                .map(|b| SqlValue::Integer(i64::from(b)))
                .ok_or_else(|| CoercionFailure::new(value, target)),
            _ => Err(CoercionFailure::new(value, target)),
        },
        ColumnType::Text => Ok(SqlValue::Text(stringify(value))),
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        // Numbers keep their JSON spelling; containers become compact JSON.
        other => other.to_string(),
    }
}
