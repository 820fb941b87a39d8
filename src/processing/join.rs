//! Equi-joins between two [`crate::types::DataSet`]s.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::types::{DataSet, DataType, Field, Schema, Value, ValueKey, NULL};

/// Which unmatched rows a join keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinKind {
    /// Only rows with a match on both sides.
    Inner,
    /// Every left row; right columns are null where nothing matched.
    #[default]
    Left,
    /// Every right row; left columns are null where nothing matched.
    Right,
    /// Left-join rows followed by the unmatched right rows.
    Outer,
}

/// Suffixes appended to non-key columns present on both sides.
pub const LEFT_SUFFIX: &str = "_x";
pub const RIGHT_SUFFIX: &str = "_y";

struct KeyColumn {
    left: usize,
    right: usize,
    data_type: DataType,
}

/// Join `left` and `right` on equality of the `on` columns.
///
/// Output columns are the keys (once, in `on` order), then the left non-key columns, then the
/// right non-key columns. Non-key names present on both sides get [`LEFT_SUFFIX`] /
/// [`RIGHT_SUFFIX`]. Keys match by [`ValueKey`] equality, so a null key matches a null key and
/// `1` matches `1.0`. Multiple matches fan out into the cross product.
///
/// Row order:
///
/// - `inner` / `left`: left rows in order, each followed by its matches in right order;
/// - `right`: right rows in order, each with its matches in left order;
/// - `outer`: the `left` order, then unmatched right rows in right order.
pub fn join<S: AsRef<str>>(
    left: &DataSet,
    right: &DataSet,
    on: &[S],
    how: JoinKind,
) -> EngineResult<DataSet> {
    let keys = resolve_keys(left, right, on)?;
    let schema = output_schema(left, right, &keys)?;

    let left_keys: Vec<usize> = keys.iter().map(|k| k.left).collect();
    let right_keys: Vec<usize> = keys.iter().map(|k| k.right).collect();
    let left_rest = non_key_indices(left.column_count(), &left_keys);
    let right_rest = non_key_indices(right.column_count(), &right_keys);

    let emit = |l: Option<&[Value]>, r: Option<&[Value]>| -> Vec<Value> {
        let mut row = Vec::with_capacity(schema.fields.len());
        for key in &keys {
            let v = match (l, r) {
                (Some(l), _) => &l[key.left],
                (None, Some(r)) => &r[key.right],
                (None, None) => &NULL,
            };
            row.push(coerce_key(v, key.data_type));
        }
        row.extend(left_rest.iter().map(|&i| l.map_or(Value::Null, |l| l[i].clone())));
        row.extend(right_rest.iter().map(|&i| r.map_or(Value::Null, |r| r[i].clone())));
        row
    };

    let mut rows = Vec::new();
    match how {
        JoinKind::Inner | JoinKind::Left | JoinKind::Outer => {
            let index = build_index(right, &right_keys);
            let mut matched_right = HashSet::new();
            for l in left.rows.iter().map(Vec::as_slice) {
                match index.get(&row_key(l, &left_keys)) {
                    Some(matches) => {
                        for &ri in matches {
                            matched_right.insert(ri);
                            rows.push(emit(Some(l), Some(right.rows[ri].as_slice())));
                        }
                    }
                    None if how != JoinKind::Inner => rows.push(emit(Some(l), None)),
                    None => {}
                }
            }
            if how == JoinKind::Outer {
                for (ri, r) in right.rows.iter().map(Vec::as_slice).enumerate() {
                    if !matched_right.contains(&ri) {
                        rows.push(emit(None, Some(r)));
                    }
                }
            }
        }
        JoinKind::Right => {
            let index = build_index(left, &left_keys);
            for r in right.rows.iter().map(Vec::as_slice) {
                match index.get(&row_key(r, &right_keys)) {
                    Some(matches) => {
                        for &li in matches {
                            rows.push(emit(Some(left.rows[li].as_slice()), Some(r)));
                        }
                    }
                    None => rows.push(emit(None, Some(r))),
                }
            }
        }
    }

    Ok(DataSet::new(schema, rows))
}

fn resolve_keys<S: AsRef<str>>(
    left: &DataSet,
    right: &DataSet,
    on: &[S],
) -> EngineResult<Vec<KeyColumn>> {
    if on.is_empty() {
        return Err(EngineError::InvalidDataSet {
            message: "join requires at least one key column".to_string(),
        });
    }

    let mut seen = HashSet::new();
    let mut keys = Vec::with_capacity(on.len());
    for name in on {
        let name = name.as_ref();
        if !seen.insert(name) {
            return Err(EngineError::DuplicateColumn {
                column: name.to_string(),
            });
        }
        let mismatch = |message: String| EngineError::JoinKeyMismatch {
            column: name.to_string(),
            message,
        };
        let li = left
            .schema
            .index_of(name)
            .ok_or_else(|| mismatch("missing from the left dataset".to_string()))?;
        let ri = right
            .schema
            .index_of(name)
            .ok_or_else(|| mismatch("missing from the right dataset".to_string()))?;

        let (lt, rt) = (left.schema.fields[li].data_type, right.schema.fields[ri].data_type);
        if !lt.is_comparable_with(rt) {
            return Err(mismatch(format!("left is {lt} but right is {rt}")));
        }
        let data_type = match (lt, rt) {
            (DataType::Null, t) | (t, DataType::Null) => t,
            (a, b) if a == b => a,
            _ => DataType::Float64,
        };
        keys.push(KeyColumn {
            left: li,
            right: ri,
            data_type,
        });
    }
    Ok(keys)
}

fn output_schema(left: &DataSet, right: &DataSet, keys: &[KeyColumn]) -> EngineResult<Schema> {
    let left_keys: Vec<usize> = keys.iter().map(|k| k.left).collect();
    let right_keys: Vec<usize> = keys.iter().map(|k| k.right).collect();
    let left_rest = non_key_indices(left.column_count(), &left_keys);
    let right_rest = non_key_indices(right.column_count(), &right_keys);

    let left_names: HashSet<&str> = left_rest
        .iter()
        .map(|&i| left.schema.fields[i].name.as_str())
        .collect();
    let right_names: HashSet<&str> = right_rest
        .iter()
        .map(|&i| right.schema.fields[i].name.as_str())
        .collect();

    let mut fields: Vec<Field> = keys
        .iter()
        .map(|k| Field::new(left.schema.fields[k.left].name.clone(), k.data_type))
        .collect();
    for &i in &left_rest {
        let f = &left.schema.fields[i];
        let name = if right_names.contains(f.name.as_str()) {
            format!("{}{LEFT_SUFFIX}", f.name)
        } else {
            f.name.clone()
        };
        fields.push(Field::new(name, f.data_type));
    }
    for &i in &right_rest {
        let f = &right.schema.fields[i];
        let name = if left_names.contains(f.name.as_str()) {
            format!("{}{RIGHT_SUFFIX}", f.name)
        } else {
            f.name.clone()
        };
        fields.push(Field::new(name, f.data_type));
    }

    let schema = Schema::new(fields);
    // Validates that suffixing did not collide with an existing name.
    DataSet::try_new(schema.clone(), Vec::new())?;
    Ok(schema)
}

fn non_key_indices(width: usize, keys: &[usize]) -> Vec<usize> {
    (0..width).filter(|i| !keys.contains(i)).collect()
}

fn row_key(row: &[Value], keys: &[usize]) -> Vec<ValueKey> {
    keys.iter().map(|&i| row[i].key()).collect()
}

fn build_index(dataset: &DataSet, keys: &[usize]) -> HashMap<Vec<ValueKey>, Vec<usize>> {
    let mut index: HashMap<Vec<ValueKey>, Vec<usize>> = HashMap::new();
    for (i, row) in dataset.rows.iter().enumerate() {
        index.entry(row_key(row, keys)).or_default().push(i);
    }
    index
}

fn coerce_key(v: &Value, data_type: DataType) -> Value {
    match (v, data_type) {
        (Value::Int64(i), DataType::Float64) => Value::Float64(*i as f64),
        _ => v.clone(),
    }
}
