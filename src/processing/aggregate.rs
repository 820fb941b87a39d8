//! Aggregation functions over a column of values.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::types::{DataSet, DataType, Value};

/// Built-in aggregation functions.
///
/// All of them ignore nulls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggFunc {
    /// Sum of numeric values; `int64` stays `int64`.
    Sum,
    /// Arithmetic mean of numeric values, always `float64`.
    Mean,
    /// Number of non-null values.
    Count,
    /// Smallest value of an ordered type.
    Min,
    /// Largest value of an ordered type.
    Max,
}

impl AggFunc {
    /// Look up an aggregation by its recipe name.
    pub fn from_name(name: &str) -> Option<Self> {
        let func = match name {
            "sum" => AggFunc::Sum,
            "mean" => AggFunc::Mean,
            "count" => AggFunc::Count,
            "min" => AggFunc::Min,
            "max" => AggFunc::Max,
            _ => return None,
        };
        Some(func)
    }

    pub fn name(self) -> &'static str {
        match self {
            AggFunc::Sum => "sum",
            AggFunc::Mean => "mean",
            AggFunc::Count => "count",
            AggFunc::Min => "min",
            AggFunc::Max => "max",
        }
    }

    /// Type of the aggregated column for an input column of `input` type.
    pub fn output_type(self, column: &str, input: DataType) -> EngineResult<DataType> {
        match (self, input) {
            (AggFunc::Count, _) => Ok(DataType::Int64),
            (AggFunc::Mean, t) if t.is_numeric() || t == DataType::Null => Ok(DataType::Float64),
            (AggFunc::Sum, t) if t.is_numeric() || t == DataType::Null => Ok(t),
            (AggFunc::Min | AggFunc::Max, t) => Ok(t),
            (func, t) => Err(EngineError::TypeMismatch {
                column: column.to_string(),
                message: format!("cannot {} a {t} column", func.name()),
            }),
        }
    }

    /// Aggregate `values` of column `column`.
    pub fn apply<'a, I>(self, column: &str, values: I) -> EngineResult<Value>
    where
        I: IntoIterator<Item = &'a Value>,
    {
        let values = values.into_iter().filter(|v| !v.is_null());
        match self {
            AggFunc::Count => Ok(Value::Int64(values.count() as i64)),
            AggFunc::Sum => sum(column, values),
            AggFunc::Mean => mean(column, values),
            AggFunc::Min => extreme(column, values, Ordering::Less),
            AggFunc::Max => extreme(column, values, Ordering::Greater),
        }
    }
}

impl fmt::Display for AggFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn not_numeric(column: &str, func: AggFunc, v: &Value) -> EngineError {
    EngineError::TypeMismatch {
        column: column.to_string(),
        message: format!("cannot {} {} value '{v}'", func.name(), v.data_type()),
    }
}

fn sum<'a>(column: &str, values: impl Iterator<Item = &'a Value>) -> EngineResult<Value> {
    let mut int_acc: Option<i64> = None;
    let mut float_acc: Option<f64> = None;
    for v in values {
        match v {
            Value::Int64(i) if float_acc.is_none() => {
                let acc = int_acc.unwrap_or(0);
                int_acc = Some(acc.checked_add(*i).ok_or_else(|| EngineError::Overflow {
                    column: column.to_string(),
                })?);
            }
            Value::Int64(_) | Value::Float64(_) => {
                // Switch to float accumulation on the first float, carrying the int total.
                let base = float_acc.or(int_acc.take().map(|i| i as f64)).unwrap_or(0.0);
                float_acc = v.as_f64().map(|f| base + f);
            }
            other => return Err(not_numeric(column, AggFunc::Sum, other)),
        }
    }
    Ok(match (int_acc, float_acc) {
        (_, Some(f)) => Value::Float64(f),
        (Some(i), None) => Value::Int64(i),
        (None, None) => Value::Null,
    })
}

fn mean<'a>(column: &str, values: impl Iterator<Item = &'a Value>) -> EngineResult<Value> {
    let mut total = 0.0;
    let mut count = 0usize;
    for v in values {
        total += v
            .as_f64()
            .ok_or_else(|| not_numeric(column, AggFunc::Mean, v))?;
        count += 1;
    }
    Ok(if count == 0 {
        Value::Null
    } else {
        Value::Float64(total / count as f64)
    })
}

fn extreme<'a>(
    column: &str,
    values: impl Iterator<Item = &'a Value>,
    wanted: Ordering,
) -> EngineResult<Value> {
    let mut best: Option<&Value> = None;
    for v in values {
        let Some(current) = best else {
            best = Some(v);
            continue;
        };
        if !v.is_orderable_with(current) {
            return Err(EngineError::TypeMismatch {
                column: column.to_string(),
                message: format!(
                    "cannot order {} against {}",
                    v.data_type(),
                    current.data_type()
                ),
            });
        }
        // NaN compares as None and never replaces the current extreme.
        if v.partial_cmp_value(current) == Some(wanted) {
            best = Some(v);
        }
    }
    Ok(best.cloned().unwrap_or(Value::Null))
}

/// Aggregate a whole column of `dataset`.
///
/// Fails with [`EngineError::UnknownColumn`] if `column` does not exist.
pub fn reduce(dataset: &DataSet, column: &str, func: AggFunc) -> EngineResult<Value> {
    let idx = dataset.schema.require(column)?;
    func.output_type(column, dataset.schema.fields[idx].data_type)?;
    func.apply(column, dataset.column_values(idx))
}

#[cfg(test)]
mod tests {
    use super::{reduce, AggFunc};
    use crate::error::EngineError;
    use crate::types::{DataSet, DataType, Field, Schema, Value};

    fn numeric_dataset_with_nulls() -> DataSet {
        let schema = Schema::new(vec![
            Field::new("id", DataType::Int64),
            Field::new("score", DataType::Float64),
            Field::new("name", DataType::Utf8),
        ]);

        let rows = vec![
            vec![Value::Int64(1), Value::Float64(10.0), Value::str("b")],
            vec![Value::Int64(2), Value::Null, Value::str("a")],
            vec![Value::Int64(3), Value::Float64(5.5), Value::Null],
        ];

        DataSet::new(schema, rows)
    }

    #[test]
    fn count_counts_non_null_values() {
        let ds = numeric_dataset_with_nulls();
        assert_eq!(reduce(&ds, "score", AggFunc::Count).unwrap(), Value::Int64(2));
        assert_eq!(reduce(&ds, "id", AggFunc::Count).unwrap(), Value::Int64(3));
    }

    #[test]
    fn sum_ignores_nulls_and_preserves_type() {
        let ds = numeric_dataset_with_nulls();
        assert_eq!(reduce(&ds, "score", AggFunc::Sum).unwrap(), Value::Float64(15.5));
        assert_eq!(reduce(&ds, "id", AggFunc::Sum).unwrap(), Value::Int64(6));
        assert_eq!(reduce(&ds, "id", AggFunc::Mean).unwrap(), Value::Float64(2.0));
    }

    #[test]
    fn min_max_ignore_nulls_and_order_strings() {
        let ds = numeric_dataset_with_nulls();
        assert_eq!(reduce(&ds, "score", AggFunc::Min).unwrap(), Value::Float64(5.5));
        assert_eq!(reduce(&ds, "score", AggFunc::Max).unwrap(), Value::Float64(10.0));
        assert_eq!(reduce(&ds, "name", AggFunc::Min).unwrap(), Value::str("a"));
        assert_eq!(reduce(&ds, "id", AggFunc::Max).unwrap(), Value::Int64(3));
    }

    #[test]
    fn all_null_columns_reduce_to_null() {
        let schema = Schema::new(vec![Field::new("score", DataType::Float64)]);
        let ds = DataSet::new(schema, vec![vec![Value::Null], vec![Value::Null]]);
        for func in [AggFunc::Sum, AggFunc::Mean, AggFunc::Min, AggFunc::Max] {
            assert_eq!(reduce(&ds, "score", func).unwrap(), Value::Null);
        }
        assert_eq!(reduce(&ds, "score", AggFunc::Count).unwrap(), Value::Int64(0));
    }

    #[test]
    fn errors() {
        let ds = numeric_dataset_with_nulls();
        assert!(matches!(
            reduce(&ds, "missing", AggFunc::Sum),
            Err(EngineError::UnknownColumn { .. })
        ));
        assert!(matches!(
            reduce(&ds, "name", AggFunc::Mean),
            Err(EngineError::TypeMismatch { .. })
        ));

        let schema = Schema::new(vec![Field::new("n", DataType::Int64)]);
        let ds = DataSet::new(
            schema,
            vec![vec![Value::Int64(i64::MAX)], vec![Value::Int64(1)]],
        );
        assert_eq!(
            reduce(&ds, "n", AggFunc::Sum).unwrap_err(),
            EngineError::Overflow {
                column: "n".to_string()
            }
        );
    }

    #[test]
    fn names_round_trip() {
        for func in [AggFunc::Sum, AggFunc::Mean, AggFunc::Count, AggFunc::Min, AggFunc::Max] {
            assert_eq!(AggFunc::from_name(func.name()), Some(func));
        }
        assert_eq!(AggFunc::from_name("median"), None);
    }
}
