//! Text cell parsing shared by the CSV reader and string-typed JSON/Parquet values.

use chrono::NaiveDate;

use crate::types::{parse_date, DataType, Value};

/// Parse a trimmed, non-empty cell as `data_type`.
///
/// The error is a short message suitable for [`crate::IngestionError::ParseError`].
pub(crate) fn parse_text(data_type: DataType, trimmed: &str) -> Result<Value, String> {
    match data_type {
        DataType::Utf8 => Ok(Value::Utf8(trimmed.to_owned())),
        DataType::Int64 => trimmed
            .parse::<i64>()
            .map(Value::Int64)
            .map_err(|e| e.to_string()),
        DataType::Float64 => trimmed
            .parse::<f64>()
            .map(Value::Float64)
            .map_err(|e| e.to_string()),
        DataType::Bool => parse_bool(trimmed).map(Value::Bool),
        DataType::Date => parse_date(trimmed)
            .map(Value::Date)
            .ok_or_else(|| "expected date (YYYY-MM-DD)".to_string()),
        DataType::Null => Err("expected an empty value".to_string()),
    }
}

pub(crate) fn parse_bool(s: &str) -> Result<bool, String> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" | "y" => Ok(true),
        "false" | "f" | "0" | "no" | "n" => Ok(false),
        _ => Err("expected bool (true/false/1/0/yes/no)".to_string()),
    }
}

/// Tracks which types every non-empty cell of a column seen so far still parses as.
///
/// Inference is stricter than [`parse_text`]: booleans must be spelled `true`/`false` and dates
/// must be exactly `YYYY-MM-DD`, so free-text columns are not narrowed by accident.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TypeCandidates {
    int: bool,
    float: bool,
    bool: bool,
    date: bool,
    seen: bool,
}

impl Default for TypeCandidates {
    fn default() -> Self {
        Self {
            int: true,
            float: true,
            bool: true,
            date: true,
            seen: false,
        }
    }
}

impl TypeCandidates {
    pub(crate) fn observe(&mut self, raw: &str) {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return;
        }
        self.seen = true;
        self.int &= trimmed.parse::<i64>().is_ok();
        self.float &= trimmed.parse::<f64>().is_ok();
        self.bool &= trimmed.eq_ignore_ascii_case("true") || trimmed.eq_ignore_ascii_case("false");
        self.date &= NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").is_ok();
    }

    /// Narrowest type that fits every observed cell; [`DataType::Utf8`] when nothing was seen.
    pub(crate) fn resolve(self) -> DataType {
        match self {
            Self { seen: false, .. } => DataType::Utf8,
            Self { int: true, .. } => DataType::Int64,
            Self { float: true, .. } => DataType::Float64,
            Self { bool: true, .. } => DataType::Bool,
            Self { date: true, .. } => DataType::Date,
            _ => DataType::Utf8,
        }
    }
}
