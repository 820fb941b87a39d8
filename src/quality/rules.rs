use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config;
use crate::error::ConfigError;
use crate::types::Value;

/// Inclusive numeric bounds for a column. Either side may be open.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RangeRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl RangeRule {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }
}

/// Data-quality rules, checked by [`crate::quality::check`].
///
/// Every category defaults to empty. Rules are evaluated in declaration order within each
/// category.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuleSet {
    /// Columns that must not contain nulls.
    pub non_null: Vec<String>,
    /// Columns whose non-null values must be pairwise distinct.
    pub unique: Vec<String>,
    /// Numeric bounds per column.
    pub range: IndexMap<String, RangeRule>,
    /// Permitted values per column. Null is only permitted when listed.
    pub allowed_values: IndexMap<String, Vec<Value>>,
}

impl RuleSet {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        config::from_json_str(text)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        config::from_yaml_str(text)
    }

    /// Load rules from a `.json`, `.yaml` or `.yml` file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        config::from_path(path)
    }

    pub fn is_empty(&self) -> bool {
        self.non_null.is_empty()
            && self.unique.is_empty()
            && self.range.is_empty()
            && self.allowed_values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_rules_in_declaration_order() {
        let rules = RuleSet::from_json_str(
            r#"{
                "non_null": ["order_id", "revenue"],
                "range": {"revenue": {"min": 0}, "qty": {"min": 1, "max": 10}},
                "allowed_values": {"region": ["APAC", "EMEA", null]}
            }"#,
        )
        .unwrap();

        assert!(rules.unique.is_empty());
        assert_eq!(rules.range.keys().collect::<Vec<_>>(), ["revenue", "qty"]);
        assert_eq!(rules.range["revenue"], RangeRule::new(Some(0.0), None));
        assert_eq!(
            rules.allowed_values["region"],
            vec![Value::str("APAC"), Value::str("EMEA"), Value::Null]
        );
    }

    #[test]
    fn decodes_yaml() {
        let rules = RuleSet::from_yaml_str("unique: [order_id]\nallowed_values:\n  code: [1, 2]\n").unwrap();
        assert_eq!(rules.unique, ["order_id"]);
        assert_eq!(
            rules.allowed_values["code"],
            vec![Value::Int64(1), Value::Int64(2)]
        );
        assert!(RuleSet::default().is_empty());
    }
}
