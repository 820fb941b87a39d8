//! Core data model types.
//!
//! Datasets are held in memory as a [`Schema`] (a list of typed [`Field`]s) plus row-major
//! [`Value`] storage. Every pipeline step produces a new [`DataSet`]; inputs are never mutated.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Logical data type for a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point number.
    Float64,
    /// Boolean.
    Bool,
    /// UTF-8 string.
    Utf8,
    /// Calendar date without a time zone.
    Date,
    /// No non-null value was seen, so the type is unknown (e.g. an all-null derived column).
    Null,
}

impl DataType {
    /// Returns `true` for [`DataType::Int64`] and [`DataType::Float64`].
    pub fn is_numeric(self) -> bool {
        matches!(self, DataType::Int64 | DataType::Float64)
    }

    /// Whether values of the two types can be compared for equality in a join.
    ///
    /// Equal types, two numeric types, or any pairing with [`DataType::Null`].
    pub fn is_comparable_with(self, other: DataType) -> bool {
        self == other
            || (self.is_numeric() && other.is_numeric())
            || self == DataType::Null
            || other == DataType::Null
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Int64 => "int64",
            DataType::Float64 => "float64",
            DataType::Bool => "bool",
            DataType::Utf8 => "utf8",
            DataType::Date => "date",
            DataType::Null => "null",
        };
        f.write_str(name)
    }
}

/// A single named, typed field in a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Field/column name.
    pub name: String,
    /// Field data type.
    pub data_type: DataType,
}

impl Field {
    /// Create a new field.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Ordered list of fields describing the shape of a [`DataSet`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Schema {
    /// Ordered list of fields.
    pub fields: Vec<Field>,
}

impl Schema {
    /// Create a new schema from fields.
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Iterate field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Returns the index of a field by name, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Returns the field with the given name, if present.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Like [`Self::index_of`], but fails with [`EngineError::UnknownColumn`].
    pub fn require(&self, name: &str) -> EngineResult<usize> {
        self.index_of(name).ok_or_else(|| EngineError::UnknownColumn {
            column: name.to_string(),
        })
    }

    fn check_unique(&self) -> EngineResult<()> {
        let mut seen = HashSet::with_capacity(self.fields.len());
        for name in self.field_names() {
            if !seen.insert(name) {
                return Err(EngineError::DuplicateColumn {
                    column: name.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// A single typed value in a [`DataSet`].
///
/// Serialized untagged: `null`, booleans, integers, floats and strings map to the matching
/// variant. Dates serialize as ISO-8601 strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Missing/empty value.
    Null,
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Float64(f64),
    /// Boolean.
    Bool(bool),
    /// UTF-8 string.
    Utf8(String),
    /// Calendar date.
    Date(NaiveDate),
}

/// Shared null, for lookups that need a `&Value` for a missing cell.
pub(crate) static NULL: Value = Value::Null;

impl Value {
    /// Convenience constructor for [`Value::Utf8`].
    pub fn str(s: impl Into<String>) -> Self {
        Value::Utf8(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The logical type of this value ([`DataType::Null`] for [`Value::Null`]).
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Null => DataType::Null,
            Value::Int64(_) => DataType::Int64,
            Value::Float64(_) => DataType::Float64,
            Value::Bool(_) => DataType::Bool,
            Value::Utf8(_) => DataType::Utf8,
            Value::Date(_) => DataType::Date,
        }
    }

    /// Numeric view of integer and float values.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int64(v) => Some(*v as f64),
            Value::Float64(v) => Some(*v),
            _ => None,
        }
    }

    /// Whether `self` and `other` belong to the same ordering family.
    ///
    /// Numbers compare with numbers; every other type only with itself. Nulls compare with
    /// nothing.
    pub fn is_orderable_with(&self, other: &Value) -> bool {
        let (a, b) = (self.data_type(), other.data_type());
        if a == DataType::Null || b == DataType::Null {
            return false;
        }
        a == b || (a.is_numeric() && b.is_numeric())
    }

    /// Ordering between two values of the same family; `None` for mixed families, nulls, or
    /// NaN.
    pub fn partial_cmp_value(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int64(a), Value::Int64(b)) => Some(a.cmp(b)),
            (Value::Utf8(a), Value::Utf8(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => None,
            },
        }
    }

    /// Hashable equality key for this value.
    pub fn key(&self) -> ValueKey {
        ValueKey::from(self)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Int64(v) => write!(f, "{v}"),
            // Keep a trailing `.0` so floats stay distinguishable from ints when rendered.
            Value::Float64(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 => {
                write!(f, "{v:.1}")
            }
            Value::Float64(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Utf8(s) => f.write_str(s),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Utf8(v.to_string())
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

/// Hashable, totally-equal projection of a [`Value`].
///
/// Used wherever values are matched by equality: group keys, join keys, uniqueness checks and
/// literal sets. Integral floats share the integer key (`1 == 1.0`), `-0.0` equals `0.0`, all
/// NaNs are one key, and `Null` equals `Null`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueKey {
    Null,
    Int(i64),
    Float(u64),
    Bool(bool),
    Str(String),
    Date(NaiveDate),
}

impl From<&Value> for ValueKey {
    fn from(v: &Value) -> Self {
        match v {
            Value::Null => ValueKey::Null,
            Value::Int64(i) => ValueKey::Int(*i),
            Value::Float64(f) => float_key(*f),
            Value::Bool(b) => ValueKey::Bool(*b),
            Value::Utf8(s) => ValueKey::Str(s.clone()),
            Value::Date(d) => ValueKey::Date(*d),
        }
    }
}

const I64_RANGE_F64: f64 = 9_223_372_036_854_775_808.0;

fn float_key(f: f64) -> ValueKey {
    if f.is_nan() {
        return ValueKey::Float(f64::NAN.to_bits());
    }
    if f.fract() == 0.0 && f >= -I64_RANGE_F64 && f < I64_RANGE_F64 {
        return ValueKey::Int(f as i64);
    }
    ValueKey::Float(f.to_bits())
}

/// Parse an ISO date (`YYYY-MM-DD`), ignoring a trailing `T...` or ` ...` time part.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    let date_part = trimmed
        .split_once(['T', ' '])
        .map(|(d, _)| d)
        .unwrap_or(trimmed);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// Days since 1970-01-01 for a date (Parquet's `DATE` encoding).
pub(crate) fn date_from_epoch_days(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days.checked_add(UNIX_EPOCH_DAYS_FROM_CE)?)
}

const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Calendar components used by the `year`/`month`/`day` expression functions.
pub(crate) fn date_part(d: NaiveDate, part: DatePart) -> i64 {
    match part {
        DatePart::Year => i64::from(d.year()),
        DatePart::Month => i64::from(d.month()),
        DatePart::Day => i64::from(d.day()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DatePart {
    Year,
    Month,
    Day,
}

/// Determine the common type of a column of values and coerce them to it.
///
/// `Int64` mixed with `Float64` promotes to `Float64`; a column without non-null values is
/// [`DataType::Null`]. Any other mix is rejected with the two conflicting types.
pub(crate) fn unify_column(values: Vec<Value>) -> Result<(DataType, Vec<Value>), (DataType, DataType)> {
    let mut common = DataType::Null;
    for v in &values {
        let t = v.data_type();
        common = match (common, t) {
            (c, DataType::Null) => c,
            (DataType::Null, t) => t,
            (c, t) if c == t => c,
            (c, t) if c.is_numeric() && t.is_numeric() => DataType::Float64,
            (c, t) => return Err((c, t)),
        };
    }

    if common != DataType::Float64 {
        return Ok((common, values));
    }
    let promoted = values
        .into_iter()
        .map(|v| match v {
            Value::Int64(i) => Value::Float64(i as f64),
            other => other,
        })
        .collect();
    Ok((common, promoted))
}

/// In-memory tabular dataset.
///
/// Rows are stored as `Vec<Vec<Value>>` in the same order as the [`Schema`] fields. Every row
/// has exactly one value per field, so every column has exactly [`Self::row_count`] values.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DataSet {
    /// Schema describing row shape.
    pub schema: Schema,
    /// Row-major value storage.
    pub rows: Vec<Vec<Value>>,
}

impl DataSet {
    /// Create a dataset from schema and rows without validating them.
    ///
    /// Prefer [`Self::try_new`] for data that did not come from this crate.
    pub fn new(schema: Schema, rows: Vec<Vec<Value>>) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == schema.fields.len()));
        Self { schema, rows }
    }

    /// Create a dataset, checking that field names are unique and every row matches the
    /// schema width.
    pub fn try_new(schema: Schema, rows: Vec<Vec<Value>>) -> EngineResult<Self> {
        schema.check_unique()?;
        let width = schema.fields.len();
        if let Some((idx, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
            return Err(EngineError::InvalidDataSet {
                message: format!(
                    "row {idx} has {} values but the schema has {width} fields",
                    row.len()
                ),
            });
        }
        Ok(Self { schema, rows })
    }

    /// Build a dataset from named columns of equal length.
    ///
    /// Each column's type is inferred from its values (see [`DataType::Null`]).
    pub fn from_columns(columns: Vec<(&str, Vec<Value>)>) -> EngineResult<Self> {
        let row_count = columns.first().map(|(_, v)| v.len()).unwrap_or(0);
        let mut fields = Vec::with_capacity(columns.len());
        let mut data = Vec::with_capacity(columns.len());
        for (name, values) in columns {
            if values.len() != row_count {
                return Err(EngineError::InvalidDataSet {
                    message: format!(
                        "column '{name}' has {} values, expected {row_count}",
                        values.len()
                    ),
                });
            }
            let (data_type, values) =
                unify_column(values).map_err(|(a, b)| EngineError::TypeMismatch {
                    column: name.to_string(),
                    message: format!("column mixes {a} and {b} values"),
                })?;
            fields.push(Field::new(name, data_type));
            data.push(values);
        }

        let mut rows: Vec<Vec<Value>> = (0..row_count)
            .map(|_| Vec::with_capacity(fields.len()))
            .collect();
        for column in data {
            for (row, v) in rows.iter_mut().zip(column) {
                row.push(v);
            }
        }
        Self::try_new(Schema::new(fields), rows)
    }

    /// Number of rows in the dataset.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns in the dataset.
    pub fn column_count(&self) -> usize {
        self.schema.fields.len()
    }

    /// Iterate the values of the column at `idx`, top to bottom.
    pub fn column_values(&self, idx: usize) -> impl Iterator<Item = &Value> + '_ {
        self.rows.iter().map(move |row| row.get(idx).unwrap_or(&NULL))
    }

    /// Cloned values of a named column, if present.
    pub fn column(&self, name: &str) -> Option<Vec<Value>> {
        let idx = self.schema.index_of(name)?;
        Some(self.column_values(idx).cloned().collect())
    }

    /// Create a new dataset containing only rows for which `predicate` returns `Ok(true)`.
    ///
    /// Stops at the first error. The returned dataset preserves the original schema and the
    /// relative order of surviving rows.
    pub fn try_filter_rows<F, E>(&self, mut predicate: F) -> Result<Self, E>
    where
        F: FnMut(&[Value]) -> Result<bool, E>,
    {
        let mut rows = Vec::new();
        for row in &self.rows {
            if predicate(row.as_slice())? {
                rows.push(row.clone());
            }
        }
        Ok(Self {
            schema: self.schema.clone(),
            rows,
        })
    }

    /// Return a new dataset with `values` stored under `field`.
    ///
    /// A column with the same name is replaced in place; otherwise the column is appended.
    pub fn with_column(&self, field: Field, values: Vec<Value>) -> EngineResult<Self> {
        if values.len() != self.row_count() {
            return Err(EngineError::InvalidDataSet {
                message: format!(
                    "column '{}' has {} values, expected {}",
                    field.name,
                    values.len(),
                    self.row_count()
                ),
            });
        }

        let mut schema = self.schema.clone();
        let existing = schema.index_of(&field.name);
        let mut rows = self.rows.clone();
        match existing {
            Some(idx) => {
                schema.fields[idx] = field;
                for (row, v) in rows.iter_mut().zip(values) {
                    row[idx] = v;
                }
            }
            None => {
                schema.fields.push(field);
                for (row, v) in rows.iter_mut().zip(values) {
                    row.push(v);
                }
            }
        }
        Ok(Self { schema, rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_keys_treat_integral_floats_as_ints() {
        assert_eq!(Value::Int64(1).key(), Value::Float64(1.0).key());
        assert_eq!(Value::Float64(-0.0).key(), Value::Float64(0.0).key());
        assert_eq!(Value::Float64(f64::NAN).key(), Value::Float64(f64::NAN).key());
        assert_ne!(Value::Float64(1.5).key(), Value::Int64(1).key());
        assert_ne!(Value::str("1").key(), Value::Int64(1).key());
        assert_eq!(Value::Null.key(), Value::Null.key());
    }

    #[test]
    fn parse_date_accepts_time_suffix() {
        let d = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        assert_eq!(parse_date("2025-01-02"), Some(d));
        assert_eq!(parse_date("2025-01-02T10:00:00"), Some(d));
        assert_eq!(parse_date(" 2025-01-02 10:00 "), Some(d));
        assert_eq!(parse_date("02/01/2025"), None);
    }

    #[test]
    fn epoch_days_convert_to_dates() {
        assert_eq!(
            date_from_epoch_days(0),
            NaiveDate::from_ymd_opt(1970, 1, 1)
        );
        assert_eq!(
            date_from_epoch_days(20_089),
            NaiveDate::from_ymd_opt(2025, 1, 1)
        );
    }

    #[test]
    fn unify_promotes_ints_mixed_with_floats() {
        let (t, values) =
            unify_column(vec![Value::Int64(1), Value::Null, Value::Float64(2.5)]).unwrap();
        assert_eq!(t, DataType::Float64);
        assert_eq!(
            values,
            vec![Value::Float64(1.0), Value::Null, Value::Float64(2.5)]
        );

        let (t, _) = unify_column(vec![Value::Null, Value::Null]).unwrap();
        assert_eq!(t, DataType::Null);

        let err = unify_column(vec![Value::Int64(1), Value::str("a")]).unwrap_err();
        assert_eq!(err, (DataType::Int64, DataType::Utf8));
    }

    #[test]
    fn try_new_rejects_duplicate_names_and_ragged_rows() {
        let dup = Schema::new(vec![
            Field::new("a", DataType::Int64),
            Field::new("a", DataType::Int64),
        ]);
        assert!(matches!(
            DataSet::try_new(dup, vec![]),
            Err(EngineError::DuplicateColumn { .. })
        ));

        let schema = Schema::new(vec![Field::new("a", DataType::Int64)]);
        assert!(matches!(
            DataSet::try_new(schema, vec![vec![Value::Int64(1), Value::Int64(2)]]),
            Err(EngineError::InvalidDataSet { .. })
        ));
    }

    #[test]
    fn from_columns_infers_types() {
        let ds = DataSet::from_columns(vec![
            ("id", vec![Value::Int64(1), Value::Int64(2)]),
            ("score", vec![Value::Int64(1), Value::Float64(0.5)]),
            ("empty", vec![Value::Null, Value::Null]),
        ])
        .unwrap();
        assert_eq!(ds.row_count(), 2);
        assert_eq!(ds.schema.fields[0].data_type, DataType::Int64);
        assert_eq!(ds.schema.fields[1].data_type, DataType::Float64);
        assert_eq!(ds.schema.fields[2].data_type, DataType::Null);
        assert_eq!(ds.rows[0][1], Value::Float64(1.0));
    }

    #[test]
    fn with_column_appends_or_replaces() {
        let ds = DataSet::from_columns(vec![("a", vec![Value::Int64(1)])]).unwrap();
        let appended = ds
            .with_column(Field::new("b", DataType::Bool), vec![Value::Bool(true)])
            .unwrap();
        assert_eq!(appended.schema.field_names().collect::<Vec<_>>(), ["a", "b"]);

        let replaced = appended
            .with_column(Field::new("a", DataType::Utf8), vec![Value::str("x")])
            .unwrap();
        assert_eq!(replaced.schema.field_names().collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(replaced.rows[0][0], Value::str("x"));
        // Original unchanged
        assert_eq!(ds.rows[0][0], Value::Int64(1));
    }

    #[test]
    fn display_keeps_float_marker() {
        assert_eq!(Value::Float64(1000.0).to_string(), "1000.0");
        assert_eq!(Value::Float64(0.25).to_string(), "0.25");
        assert_eq!(Value::Int64(7).to_string(), "7");
        assert_eq!(
            Value::Date(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()).to_string(),
            "2025-01-01"
        );
    }
}
