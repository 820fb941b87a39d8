//! Data-quality rule engine.
//!
//! [`check`] evaluates a [`RuleSet`] against a dataset and returns a [`DqReport`]. Violations
//! are data, not errors: `check` never fails, and a rule naming a missing column yields an
//! [`IssueKind::ColumnMissing`] issue.
//!
//! Rules run in a fixed order (`non_null`, `unique`, `range`, `allowed_values`), each category
//! in declaration order, so identical inputs always give identical reports.
//!
//! ```rust
//! use dataops_engine::quality::{check, RuleSet};
//! use dataops_engine::types::{DataSet, Value};
//!
//! let ds = DataSet::from_columns(vec![(
//!     "order_id",
//!     vec![Value::Int64(1), Value::Int64(2), Value::Int64(1)],
//! )])
//! .unwrap();
//! let rules = RuleSet::from_json_str(r#"{"unique": ["order_id"]}"#).unwrap();
//!
//! let report = check(&ds, &rules);
//! assert!(!report.passed());
//! assert_eq!(
//!     report.messages(),
//!     ["Unique violation: order_id has 1 duplicate values in 1 groups"]
//! );
//! ```

mod report;
mod rules;

use std::collections::{HashMap, HashSet};

pub use report::{DqIssue, DqReport, IssueKind, RuleKind};
pub use rules::{RangeRule, RuleSet};

use crate::types::{parse_date, DataSet, DataType, Value, ValueKey};

/// Evaluate `rules` against `dataset`.
pub fn check(dataset: &DataSet, rules: &RuleSet) -> DqReport {
    let mut issues = Vec::new();
    let mut push = |rule: RuleKind, column: &str, kind: IssueKind| {
        issues.push(DqIssue {
            rule,
            column: column.to_string(),
            kind,
        });
    };

    for column in &rules.non_null {
        let Some(idx) = dataset.schema.index_of(column) else {
            push(RuleKind::NonNull, column, IssueKind::ColumnMissing);
            continue;
        };
        let count = dataset.column_values(idx).filter(|v| v.is_null()).count();
        if count > 0 {
            push(RuleKind::NonNull, column, IssueKind::NullValuesFound { count });
        }
    }

    for column in &rules.unique {
        let Some(idx) = dataset.schema.index_of(column) else {
            push(RuleKind::Unique, column, IssueKind::ColumnMissing);
            continue;
        };
        let mut seen: HashMap<ValueKey, usize> = HashMap::new();
        for v in dataset.column_values(idx).filter(|v| !v.is_null()) {
            *seen.entry(v.key()).or_default() += 1;
        }
        let groups = seen.values().filter(|&&n| n > 1).count();
        let rows: usize = seen.values().map(|&n| n - 1).sum();
        if rows > 0 {
            push(RuleKind::Unique, column, IssueKind::DuplicateValues { groups, rows });
        }
    }

    for (column, bounds) in &rules.range {
        let Some(idx) = dataset.schema.index_of(column) else {
            push(RuleKind::Range, column, IssueKind::ColumnMissing);
            continue;
        };
        let (mut non_numeric, mut nan) = (0, 0);
        let (mut below, mut above) = (0, 0);
        for v in dataset.column_values(idx).filter(|v| !v.is_null()) {
            let Some(x) = v.as_f64() else {
                non_numeric += 1;
                continue;
            };
            if x.is_nan() {
                nan += 1;
                continue;
            }
            if bounds.min.is_some_and(|min| x < min) {
                below += 1;
            }
            if bounds.max.is_some_and(|max| x > max) {
                above += 1;
            }
        }
        if non_numeric > 0 {
            push(
                RuleKind::Range,
                column,
                IssueKind::TypeMismatch { count: non_numeric },
            );
        }
        if nan > 0 {
            push(RuleKind::Range, column, IssueKind::NotANumber { count: nan });
        }
        if let Some(min) = bounds.min.filter(|_| below > 0) {
            push(RuleKind::Range, column, IssueKind::BelowMin { min, count: below });
        }
        if let Some(max) = bounds.max.filter(|_| above > 0) {
            push(RuleKind::Range, column, IssueKind::AboveMax { max, count: above });
        }
    }

    for (column, allowed) in &rules.allowed_values {
        let Some(idx) = dataset.schema.index_of(column) else {
            push(RuleKind::AllowedValues, column, IssueKind::ColumnMissing);
            continue;
        };
        let is_date = dataset.schema.fields[idx].data_type == DataType::Date;
        let allowed: HashSet<ValueKey> = allowed
            .iter()
            .map(|v| match v {
                // Rule files can only spell dates as strings.
                Value::Utf8(s) if is_date => parse_date(s)
                    .map_or_else(|| v.key(), |d| Value::Date(d).key()),
                _ => v.key(),
            })
            .collect();
        let mut count = 0;
        let mut reported = HashSet::new();
        let mut values = Vec::new();
        for v in dataset.column_values(idx) {
            let key = v.key();
            if allowed.contains(&key) {
                continue;
            }
            count += 1;
            if reported.insert(key) {
                values.push(v.clone());
            }
        }
        if count > 0 {
            push(
                RuleKind::AllowedValues,
                column,
                IssueKind::DisallowedValues { count, values },
            );
        }
    }

    DqReport::new(issues)
}
