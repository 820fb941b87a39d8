use std::fmt;

use serde::Serialize;

use crate::types::Value;

/// Rule category an issue belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    NonNull,
    Unique,
    Range,
    AllowedValues,
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RuleKind::NonNull => "non_null",
            RuleKind::Unique => "unique",
            RuleKind::Range => "range",
            RuleKind::AllowedValues => "allowed_values",
        })
    }
}

/// What a rule found.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IssueKind {
    /// The rule names a column the dataset does not have.
    ColumnMissing,
    NullValuesFound {
        count: usize,
    },
    /// `groups` distinct values repeat; `rows` rows repeat an earlier value.
    DuplicateValues {
        groups: usize,
        rows: usize,
    },
    /// Non-null values that are not numeric, so no bound applies to them.
    TypeMismatch {
        count: usize,
    },
    /// Floating-point NaN values, which fall outside any bound.
    NotANumber {
        count: usize,
    },
    BelowMin {
        min: f64,
        count: usize,
    },
    AboveMax {
        max: f64,
        count: usize,
    },
    /// `values` lists every distinct offending value in first-seen order.
    DisallowedValues {
        count: usize,
        values: Vec<Value>,
    },
}

/// A single rule violation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DqIssue {
    pub rule: RuleKind,
    pub column: String,
    #[serde(flatten)]
    pub kind: IssueKind,
}

impl fmt::Display for DqIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let col = &self.column;
        match &self.kind {
            IssueKind::ColumnMissing => write!(f, "Column missing for {}: {col}", self.rule),
            IssueKind::NullValuesFound { count } => {
                write!(f, "Non-null violation: {col} has {count} nulls")
            }
            IssueKind::DuplicateValues { groups, rows } => write!(
                f,
                "Unique violation: {col} has {rows} duplicate values in {groups} groups"
            ),
            IssueKind::TypeMismatch { count } => {
                write!(f, "Range violation: {col} has {count} non-numeric values")
            }
            IssueKind::NotANumber { count } => {
                write!(f, "Range violation: {col} has {count} NaN values")
            }
            IssueKind::BelowMin { min, count } => {
                write!(f, "Range violation: {col} < {min} count={count}")
            }
            IssueKind::AboveMax { max, count } => {
                write!(f, "Range violation: {col} > {max} count={count}")
            }
            IssueKind::DisallowedValues { count, values } => {
                write!(
                    f,
                    "Allowed-values violation: {col} has {count} out-of-domain values ["
                )?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str("]")
            }
        }
    }
}

/// Result of [`crate::quality::check`].
///
/// Only `check` builds reports, so [`DqReport::passed`] always agrees with the issue list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DqReport {
    passed: bool,
    issues: Vec<DqIssue>,
}

impl DqReport {
    pub(crate) fn new(issues: Vec<DqIssue>) -> Self {
        Self {
            passed: issues.is_empty(),
            issues,
        }
    }

    /// `true` iff no rule was violated.
    pub fn passed(&self) -> bool {
        self.passed
    }

    /// Violations in evaluation order.
    pub fn issues(&self) -> &[DqIssue] {
        &self.issues
    }

    /// Human-readable message per issue.
    pub fn messages(&self) -> Vec<String> {
        self.issues.iter().map(ToString::to_string).collect()
    }
}

impl fmt::Display for DqReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.passed {
            return f.write_str("All data-quality checks passed.");
        }
        for (i, issue) in self.issues.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "- {issue}")?;
        }
        Ok(())
    }
}
