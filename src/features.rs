//! Feature adapter: request payload to the fixed-schema row the models were fit on.

use crate::errors::AppError;
use serde_json::{Map, Value};
use std::fmt;

/// Columns every `/predict` body must carry, in training column order.
pub const REQUIRED_FIELDS: [&str; 12] = [
    "totalIncome",
    "totalExpense",
    "savings",
    "noOfTransactions",
    "avgTransactionAmount",
    "donatedAmount",
    "foodSpend",
    "educationSpend",
    "entertainmentSpend",
    "luxurySpend",
    "otherSpend",
    "topCategory",
];

/// Column injected for credit-score inference. Holds the encoded class id.
pub const TAG_COLUMN: &str = "tag";

/// One cell of a feature row.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Number(f64),
    Text(String),
    /// JSON `null`: the key was present but carries no value.
    Missing,
}

impl FeatureValue {
    fn from_json(column: &str, value: &Value) -> Result<Self, AppError> {
        match value {
            Value::Number(n) => n.as_f64().map(FeatureValue::Number).ok_or_else(|| {
                AppError::Inference(format!("column '{}' holds a number outside f64 range", column))
            }),
            Value::String(s) => Ok(FeatureValue::Text(s.clone())),
            Value::Bool(b) => Ok(FeatureValue::Number(if *b { 1.0 } else { 0.0 })),
            Value::Null => Ok(FeatureValue::Missing),
            Value::Array(_) | Value::Object(_) => Err(AppError::Inference(format!(
                "column '{}' must be a scalar, got {}",
                column, value
            ))),
        }
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureValue::Number(n) => write!(f, "{}", n),
            FeatureValue::Text(s) => write!(f, "{}", s),
            FeatureValue::Missing => f.write_str("null"),
        }
    }
}

/// A single ordered row of named features.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureRow {
    columns: Vec<(String, FeatureValue)>,
}

impl FeatureRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a column, replacing any earlier column of the same name in place.
    pub fn push(&mut self, name: impl Into<String>, value: FeatureValue) {
        let name = name.into();
        match self.columns.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.columns.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Copy of this row with the encoded tag appended as the `tag` column.
    pub fn with_tag(&self, class_id: u32) -> FeatureRow {
        let mut row = self.clone();
        row.push(TAG_COLUMN, FeatureValue::Number(f64::from(class_id)));
        row
    }
}

/// Names of required fields absent from `payload`.
pub fn missing_fields(payload: &Map<String, Value>) -> Vec<&'static str> {
    REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|field| !payload.contains_key(*field))
        .collect()
}

/// Maps a `/predict` body onto the training schema.
///
/// Presence is checked by exact key. Keys outside [`REQUIRED_FIELDS`] are dropped.
pub fn adapt(payload: &Value) -> Result<FeatureRow, AppError> {
    let object = match payload {
        Value::Object(object) => object,
        // Arrays and strings answer membership checks (element and substring),
        // so they fail the presence check like any object with absent keys.
        Value::Array(_) | Value::String(_) if !contains_all_fields(payload) => {
            return Err(AppError::missing_fields());
        }
        other => {
            return Err(AppError::Inference(format!(
                "request body must be a JSON object, got {}",
                json_kind(other)
            )))
        }
    };

    let missing = missing_fields(object);
    if !missing.is_empty() {
        tracing::debug!("Missing required fields: {:?}", missing);
        return Err(AppError::missing_fields());
    }

    let mut row = FeatureRow::new();
    for field in REQUIRED_FIELDS {
        // Presence was checked above.
        let value = &object[field];
        row.push(field, FeatureValue::from_json(field, value)?);
    }

    Ok(row)
}

fn contains_all_fields(payload: &Value) -> bool {
    match payload {
        Value::Array(items) => REQUIRED_FIELDS
            .iter()
            .all(|field| items.iter().any(|item| item.as_str() == Some(*field))),
        Value::String(text) => REQUIRED_FIELDS.iter().all(|field| text.contains(field)),
        _ => false,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
