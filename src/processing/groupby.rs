//! Grouped aggregation.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::error::{EngineError, EngineResult};
use crate::types::{DataSet, DataType, Field, Schema, Value, ValueKey};

use super::aggregate::AggFunc;

/// One output column of a [`groupby`]: aggregate column `column` with `func`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregation {
    pub column: String,
    pub func: AggFunc,
}

impl Aggregation {
    pub fn new(column: impl Into<String>, func: AggFunc) -> Self {
        Self {
            column: column.into(),
            func,
        }
    }
}

/// Partition `dataset` by the distinct values of `by` and aggregate each partition.
///
/// Output has one row per distinct key tuple in order of first appearance, with the key
/// columns first and then one column per aggregation, named after its target column. Null is a
/// key value like any other. An empty `by` aggregates the whole dataset into a single row.
pub fn groupby<S: AsRef<str>>(
    dataset: &DataSet,
    by: &[S],
    aggs: &[Aggregation],
) -> EngineResult<DataSet> {
    let mut seen = HashSet::new();
    let mut key_indices = Vec::with_capacity(by.len());
    for name in by {
        let name = name.as_ref();
        if !seen.insert(name) {
            return Err(EngineError::DuplicateColumn {
                column: name.to_string(),
            });
        }
        key_indices.push(dataset.schema.require(name)?);
    }

    let mut fields: Vec<Field> = key_indices
        .iter()
        .map(|&i| dataset.schema.fields[i].clone())
        .collect();
    let mut targets = Vec::with_capacity(aggs.len());
    for agg in aggs {
        if !seen.insert(agg.column.as_str()) {
            return Err(EngineError::DuplicateColumn {
                column: agg.column.clone(),
            });
        }
        let idx = dataset.schema.require(&agg.column)?;
        let output = agg
            .func
            .output_type(&agg.column, dataset.schema.fields[idx].data_type)?;
        fields.push(Field::new(agg.column.clone(), output));
        targets.push(idx);
    }

    let mut groups: IndexMap<Vec<ValueKey>, Vec<usize>> = IndexMap::new();
    for (i, row) in dataset.rows.iter().enumerate() {
        let key = key_indices.iter().map(|&k| row[k].key()).collect();
        groups.entry(key).or_default().push(i);
    }
    if by.is_empty() && groups.is_empty() {
        groups.insert(Vec::new(), Vec::new());
    }

    let mut rows = Vec::with_capacity(groups.len());
    for members in groups.values() {
        let mut row: Vec<Value> = match members.first() {
            Some(&first) => key_indices
                .iter()
                .map(|&k| dataset.rows[first][k].clone())
                .collect(),
            None => Vec::new(),
        };
        for (agg, &idx) in aggs.iter().zip(&targets) {
            let values = members.iter().map(|&m| &dataset.rows[m][idx]);
            let value = agg.func.apply(&agg.column, values)?;
            row.push(promote(value, fields[row.len()].data_type));
        }
        rows.push(row);
    }

    Ok(DataSet::new(Schema::new(fields), rows))
}

/// Keep aggregated values consistent with the declared output type.
fn promote(value: Value, data_type: DataType) -> Value {
    match (value, data_type) {
        (Value::Int64(i), DataType::Float64) => Value::Float64(i as f64),
        (v, _) => v,
    }
}
