//! Declarative transform recipes.
//!
//! A [`Recipe`] is plain data: it can be decoded, compared and serialized without running
//! anything. Expressions and aggregation names are only checked when the recipe is applied by
//! [`crate::pipeline`].
//!
//! ```rust
//! use dataops_engine::recipe::Recipe;
//!
//! let recipe = Recipe::from_yaml_str(
//!     r#"
//! filter: "revenue >= 0"
//! derive:
//!   - name: rev_k
//!     expr: revenue / 1000
//! join: { right_df: regions, on: [region] }
//! groupby:
//!   by: [region]
//!   agg: { revenue: sum }
//! "#,
//! )
//! .unwrap();
//! assert_eq!(recipe.join.unwrap().right, "regions");
//! ```

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config;
use crate::error::ConfigError;
pub use crate::processing::JoinKind;

/// An ordered set of optional transform steps.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Recipe {
    /// Columns to keep, in output order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub select: Option<Vec<String>>,
    /// Boolean row predicate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    /// Derived columns, computed in order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub derive: Vec<DeriveSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join: Option<JoinSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groupby: Option<GroupBySpec>,
}

/// A derived column: `name = expr`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeriveSpec {
    pub name: String,
    pub expr: String,
}

impl DeriveSpec {
    pub fn new(name: impl Into<String>, expr: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expr: expr.into(),
        }
    }
}

/// Join against a named auxiliary dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JoinSpec {
    /// Name of the right-hand dataset.
    #[serde(alias = "right_df")]
    pub right: String,
    /// Key columns, present on both sides.
    pub on: Vec<String>,
    #[serde(default)]
    pub how: JoinKind,
}

/// Grouped aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupBySpec {
    /// Grouping key columns.
    #[serde(default)]
    pub by: Vec<String>,
    /// Target column → aggregation name (`sum`, `mean`, `count`, `min`, `max`), in output order.
    pub agg: IndexMap<String, String>,
}

impl Recipe {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        config::from_json_str(text)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        config::from_yaml_str(text)
    }

    /// Load a recipe from a `.json`, `.yaml` or `.yml` file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        config::from_path(path)
    }

    /// Whether the recipe has no steps at all.
    pub fn is_empty(&self) -> bool {
        self.select.is_none()
            && self.filter.is_none()
            && self.derive.is_empty()
            && self.join.is_none()
            && self.groupby.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_json_with_defaults_and_alias() {
        let recipe = Recipe::from_json_str(
            r#"{
                "select": ["order_id", "region", "revenue"],
                "filter": "revenue >= 0",
                "join": {"right_df": "regions", "on": ["region"]},
                "groupby": {"by": ["region"], "agg": {"revenue": "sum", "order_id": "count"}}
            }"#,
        )
        .unwrap();

        let join = recipe.join.as_ref().unwrap();
        assert_eq!(join.right, "regions");
        assert_eq!(join.how, JoinKind::Left);
        assert!(recipe.derive.is_empty());

        let agg: Vec<_> = recipe.groupby.as_ref().unwrap().agg.keys().collect();
        assert_eq!(agg, ["revenue", "order_id"]);
    }

    #[test]
    fn decodes_yaml_join_kinds() {
        let recipe = Recipe::from_yaml_str("join:\n  right: r\n  on: [k]\n  how: outer\n").unwrap();
        assert_eq!(recipe.join.unwrap().how, JoinKind::Outer);
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(matches!(
            Recipe::from_json_str(r#"{"fliter": "x > 1"}"#),
            Err(ConfigError::Json(_))
        ));
        assert!(matches!(
            Recipe::from_yaml_str("join: {right: r, on: [k], how: sideways}"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn empty_recipe() {
        assert!(Recipe::from_json_str("{}").unwrap().is_empty());
        assert!(!Recipe {
            derive: vec![DeriveSpec::new("a", "1")],
            ..Recipe::default()
        }
        .is_empty());
    }
}
