//! Column-level dataset profiles.
//!
//! ```rust
//! use dataops_engine::profile::profile;
//! use dataops_engine::types::{DataSet, Value};
//!
//! let ds = DataSet::from_columns(vec![(
//!     "revenue",
//!     vec![Value::Int64(1), Value::Int64(3), Value::Null],
//! )])
//! .unwrap();
//! let p = profile(&ds, 10);
//! let revenue = &p.columns["revenue"];
//! assert_eq!(revenue.nulls, 1);
//! assert_eq!(revenue.mean(), Some(2.0));
//! ```

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::Serialize;

use crate::types::{DataSet, DataType, ValueKey};

/// Default number of `top_values` kept for non-numeric columns.
pub const DEFAULT_MAX_CATEGORIES: usize = 10;

/// Profile of a whole dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataProfile {
    pub rows: usize,
    pub cols: usize,
    /// One entry per column, in schema order.
    pub columns: IndexMap<String, ColumnProfile>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnProfile {
    pub dtype: DataType,
    pub nulls: usize,
    /// Percentage of null cells, `0.0` for an empty dataset.
    pub null_pct: f64,
    /// Distinct non-null values.
    pub nunique: usize,
    #[serde(flatten)]
    pub summary: ColumnSummary,
}

impl ColumnProfile {
    pub fn mean(&self) -> Option<f64> {
        match &self.summary {
            ColumnSummary::Numeric { mean, .. } => *mean,
            ColumnSummary::Categorical { .. } => None,
        }
    }
}

/// Type-dependent part of a [`ColumnProfile`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ColumnSummary {
    /// `Int64` and `Float64` columns. NaN is skipped; `std` is the sample standard deviation
    /// and needs at least two values.
    Numeric {
        min: Option<f64>,
        max: Option<f64>,
        mean: Option<f64>,
        std: Option<f64>,
    },
    /// Every other type: the most frequent non-null values with their counts, most frequent
    /// first, ties in order of first appearance.
    Categorical { top_values: IndexMap<String, usize> },
}

/// Profile every column of `dataset`, keeping at most `max_categories` top values.
pub fn profile(dataset: &DataSet, max_categories: usize) -> DataProfile {
    let rows = dataset.row_count();
    let columns = dataset
        .schema
        .fields
        .iter()
        .enumerate()
        .map(|(idx, field)| {
            (
                field.name.clone(),
                profile_column(dataset, idx, field.data_type, max_categories),
            )
        })
        .collect();
    DataProfile {
        rows,
        cols: dataset.column_count(),
        columns,
    }
}

fn profile_column(
    dataset: &DataSet,
    idx: usize,
    dtype: DataType,
    max_categories: usize,
) -> ColumnProfile {
    let rows = dataset.row_count();
    let nulls = dataset.column_values(idx).filter(|v| v.is_null()).count();

    // key -> (first position, count, rendered text)
    let mut counts: HashMap<ValueKey, (usize, usize, String)> = HashMap::new();
    for (pos, v) in dataset.column_values(idx).filter(|v| !v.is_null()).enumerate() {
        counts
            .entry(v.key())
            .or_insert_with(|| (pos, 0, v.to_string()))
            .1 += 1;
    }

    let summary = if dtype.is_numeric() {
        let values: Vec<f64> = dataset
            .column_values(idx)
            .filter_map(|v| v.as_f64())
            .filter(|x| !x.is_nan())
            .collect();
        numeric_summary(&values)
    } else {
        let mut ranked: Vec<_> = counts.values().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ColumnSummary::Categorical {
            top_values: ranked
                .into_iter()
                .take(max_categories)
                .map(|(_, count, text)| (text.clone(), *count))
                .collect(),
        }
    };

    ColumnProfile {
        dtype,
        nulls,
        null_pct: if rows == 0 {
            0.0
        } else {
            nulls as f64 * 100.0 / rows as f64
        },
        nunique: counts.len(),
        summary,
    }
}

fn numeric_summary(values: &[f64]) -> ColumnSummary {
    let n = values.len();
    let mean = (n > 0).then(|| values.iter().sum::<f64>() / n as f64);
    let std = mean.filter(|_| n > 1).map(|m| {
        let ss: f64 = values.iter().map(|x| (x - m).powi(2)).sum();
        (ss / (n - 1) as f64).sqrt()
    });
    ColumnSummary::Numeric {
        min: values.iter().copied().reduce(f64::min),
        max: values.iter().copied().reduce(f64::max),
        mean,
        std,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;

    fn sales() -> DataSet {
        DataSet::from_columns(vec![
            (
                "region",
                ["APAC", "EMEA", "APAC", "AMER", "EMEA", "APAC"]
                    .into_iter()
                    .map(Value::str)
                    .collect(),
            ),
            (
                "revenue",
                vec![
                    Value::Int64(2),
                    Value::Int64(4),
                    Value::Int64(4),
                    Value::Int64(4),
                    Value::Int64(5),
                    Value::Null,
                ],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn numeric_columns_get_moments() {
        let p = profile(&sales(), DEFAULT_MAX_CATEGORIES);
        assert_eq!((p.rows, p.cols), (6, 2));
        let revenue = &p.columns["revenue"];
        assert_eq!(revenue.nulls, 1);
        assert_eq!(revenue.nunique, 3);
        let ColumnSummary::Numeric { min, max, mean, std } = revenue.summary else {
            panic!("revenue is numeric");
        };
        assert_eq!((min, max, mean), (Some(2.0), Some(5.0), Some(3.8)));
        // sample variance of 2,4,4,4,5 is 1.2
        assert!((std.unwrap() - 1.2_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn categorical_columns_rank_by_count_then_first_seen() {
        let p = profile(&sales(), 2);
        let ColumnSummary::Categorical { top_values } = &p.columns["region"].summary else {
            panic!("region is categorical");
        };
        let ranked: Vec<(&str, usize)> = top_values.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        assert_eq!(ranked, vec![("APAC", 3), ("EMEA", 2)]);
    }

    #[test]
    fn empty_datasets_have_no_statistics() {
        let ds = DataSet::new(sales().schema, vec![]);
        let p = profile(&ds, DEFAULT_MAX_CATEGORIES);
        let revenue = &p.columns["revenue"];
        assert_eq!(revenue.null_pct, 0.0);
        assert_eq!(
            revenue.summary,
            ColumnSummary::Numeric {
                min: None,
                max: None,
                mean: None,
                std: None
            }
        );
    }

    #[test]
    fn serializes_flat_like_a_report_table() {
        let p = profile(&sales(), 1);
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["columns"]["region"]["top_values"]["APAC"], 3);
        assert_eq!(json["columns"]["revenue"]["dtype"], "int64");
        assert!(json["columns"]["revenue"].get("top_values").is_none());
    }
}
