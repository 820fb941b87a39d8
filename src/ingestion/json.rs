//! JSON ingestion.
//!
//! Supported inputs:
//! - A JSON array of objects: `[{"a":1}, {"a":2}]`
//! - A single object: `{"a":1}`
//! - Newline-delimited JSON (NDJSON): `{"a":1}\n{"a":2}\n`
//!
//! Nested fields are addressed with dot paths in schema field names (e.g. `user.name`).
//! Dates are ISO strings (`YYYY-MM-DD`).

use std::fs;
use std::path::Path;

use serde_json::Map;

use super::cell;
use crate::error::{IngestionError, IngestionResult};
use crate::types::{DataSet, DataType, Field, Schema, Value};

type JsonValue = serde_json::Value;

/// Ingest JSON into an in-memory `DataSet`. Every record must contain every schema field.
pub fn ingest_json_from_path(path: impl AsRef<Path>, schema: &Schema) -> IngestionResult<DataSet> {
    let text = fs::read_to_string(path)?;
    ingest_json_from_str(&text, schema)
}

/// Ingest JSON from an in-memory string into a [`DataSet`].
pub fn ingest_json_from_str(input: &str, schema: &Schema) -> IngestionResult<DataSet> {
    let records = parse_records(input)?;
    ingest_json_values(&records, schema, false)
}

/// Ingest JSON without a schema.
///
/// Columns are the top-level keys in first-seen order. A key absent from a record reads as
/// null. Types follow the values: integers → `Int64` (promoted to `Float64` when mixed with
/// floats), booleans → `Bool`, strings → `Date` when every one is an ISO date and `Utf8`
/// otherwise, nested objects and arrays → `Utf8` holding their JSON text. Any other mix of
/// types is a [`IngestionError::SchemaMismatch`].
pub fn ingest_json_inferred_from_str(input: &str) -> IngestionResult<DataSet> {
    let records = parse_records(input)?;
    let schema = infer_schema(&records)?;
    ingest_json_values(&records, &schema, true)
}

/// Like [`ingest_json_inferred_from_str`], reading from `path`.
pub fn ingest_json_inferred_from_path(path: impl AsRef<Path>) -> IngestionResult<DataSet> {
    let text = fs::read_to_string(path)?;
    ingest_json_inferred_from_str(&text)
}

fn parse_records(input: &str) -> IngestionResult<Vec<JsonValue>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(IngestionError::SchemaMismatch {
            message: "json input is empty".to_string(),
        });
    }

    // A single JSON document first, then NDJSON.
    if let Ok(v) = serde_json::from_str::<JsonValue>(trimmed) {
        return match v {
            JsonValue::Array(items) => Ok(items),
            JsonValue::Object(_) => Ok(vec![v]),
            _ => Err(IngestionError::SchemaMismatch {
                message: "json must be an object, an array of objects, or NDJSON".to_string(),
            }),
        };
    }

    trimmed
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str::<JsonValue>(line.trim()).map_err(|e| {
                IngestionError::SchemaMismatch {
                    message: format!("invalid ndjson at line {}: {}", i + 1, e),
                }
            })
        })
        .collect()
}

fn as_object(row_num: usize, v: &JsonValue) -> IngestionResult<&Map<String, JsonValue>> {
    v.as_object().ok_or_else(|| IngestionError::SchemaMismatch {
        message: format!("row {row_num} is not a json object"),
    })
}

fn ingest_json_values(
    values: &[JsonValue],
    schema: &Schema,
    missing_as_null: bool,
) -> IngestionResult<DataSet> {
    let mut rows: Vec<Vec<Value>> = Vec::with_capacity(values.len());

    for (idx0, v) in values.iter().enumerate() {
        let row_num = idx0 + 1;
        let obj = as_object(row_num, v)?;

        let mut row: Vec<Value> = Vec::with_capacity(schema.fields.len());
        for field in &schema.fields {
            let value = match get_by_dot_path(obj, &field.name) {
                Some(jv) => convert_json_value(row_num, &field.name, field.data_type, jv)?,
                None if missing_as_null => Value::Null,
                None => {
                    return Err(IngestionError::SchemaMismatch {
                        message: format!("row {row_num} missing required field '{}'", field.name),
                    });
                }
            };
            row.push(value);
        }
        rows.push(row);
    }

    Ok(DataSet::new(schema.clone(), rows))
}

fn get_by_dot_path<'a>(root: &'a Map<String, JsonValue>, path: &str) -> Option<&'a JsonValue> {
    // An exact key wins over a nested path.
    if let Some(v) = root.get(path) {
        return Some(v);
    }
    let mut segments = path.split('.');
    let mut current = root.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn convert_json_value(
    row: usize,
    column: &str,
    data_type: DataType,
    v: &JsonValue,
) -> IngestionResult<Value> {
    if v.is_null() {
        return Ok(Value::Null);
    }
    let fail = |message: &str| IngestionError::ParseError {
        row,
        column: column.to_string(),
        raw: v.to_string(),
        message: message.to_string(),
    };

    match data_type {
        DataType::Utf8 => match v {
            JsonValue::String(s) => Ok(Value::Utf8(s.clone())),
            JsonValue::Object(_) | JsonValue::Array(_) => Ok(Value::Utf8(v.to_string())),
            _ => Err(fail("expected string")),
        },
        DataType::Bool => v.as_bool().map(Value::Bool).ok_or_else(|| fail("expected bool")),
        DataType::Int64 => {
            if let Some(n) = v.as_i64() {
                Ok(Value::Int64(n))
            } else if v.is_u64() {
                Err(fail("u64 out of range for i64"))
            } else {
                Err(fail("expected integer number"))
            }
        }
        DataType::Float64 => v.as_f64().map(Value::Float64).ok_or_else(|| fail("expected number")),
        DataType::Date => {
            let s = v.as_str().ok_or_else(|| fail("expected date string"))?;
            cell::parse_text(DataType::Date, s.trim()).map_err(|m| fail(&m))
        }
        DataType::Null => Err(fail("expected null")),
    }
}

/// Per-key type observed so far during inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Seen {
    Nothing,
    Int,
    Float,
    Bool,
    Text { all_dates: bool },
    Nested,
}

fn observe(seen: Seen, v: &JsonValue) -> Option<Seen> {
    let next = match v {
        JsonValue::Null => return Some(seen),
        JsonValue::Bool(_) => Seen::Bool,
        JsonValue::Number(n) if n.is_i64() => Seen::Int,
        JsonValue::Number(_) => Seen::Float,
        JsonValue::String(s) => Seen::Text {
            all_dates: chrono::NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").is_ok(),
        },
        JsonValue::Array(_) | JsonValue::Object(_) => Seen::Nested,
    };
    match (seen, next) {
        (Seen::Nothing, n) => Some(n),
        (Seen::Int | Seen::Float, Seen::Int | Seen::Float) if seen != next => Some(Seen::Float),
        (Seen::Text { all_dates: a }, Seen::Text { all_dates: b }) => {
            Some(Seen::Text { all_dates: a && b })
        }
        (s, n) if s == n => Some(s),
        _ => None,
    }
}

fn infer_schema(records: &[JsonValue]) -> IngestionResult<Schema> {
    let mut columns: Vec<(String, Seen)> = Vec::new();
    for (idx0, record) in records.iter().enumerate() {
        for (key, v) in as_object(idx0 + 1, record)? {
            let pos = match columns.iter().position(|(name, _)| name == key) {
                Some(pos) => pos,
                None => {
                    columns.push((key.clone(), Seen::Nothing));
                    columns.len() - 1
                }
            };
            let slot = &mut columns[pos].1;
            *slot = observe(*slot, v).ok_or_else(|| IngestionError::SchemaMismatch {
                message: format!("field '{key}' mixes incompatible json types"),
            })?;
        }
    }

    Ok(Schema::new(
        columns
            .into_iter()
            .map(|(name, seen)| {
                let data_type = match seen {
                    Seen::Int => DataType::Int64,
                    Seen::Float => DataType::Float64,
                    Seen::Bool => DataType::Bool,
                    Seen::Text { all_dates: true } => DataType::Date,
                    Seen::Nothing | Seen::Text { .. } | Seen::Nested => DataType::Utf8,
                };
                Field::new(name, data_type)
            })
            .collect(),
    ))
}
