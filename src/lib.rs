//! `dataops-engine` runs declarative data recipes over in-memory [`types::DataSet`]s.
//!
//! A recipe is plain data (JSON or YAML) naming up to five steps, always applied in the same
//! order: `select`, `filter`, `derive`, `join`, `groupby`. Filter predicates and derived
//! columns are written in a small, restricted expression language that is parsed and checked
//! against an allow-list before any row is touched. A separate rule set describes data-quality
//! checks whose violations are reported, never raised.
//!
//! ## Modules
//!
//! - [`types`]: schema, values and the row-major dataset
//! - [`expression`]: the restricted expression language
//! - [`processing`]: select/filter/derive/join/groupby kernels
//! - [`recipe`] and [`pipeline`]: recipe data and its execution
//! - [`quality`]: data-quality rules and reports
//! - [`ingestion`] and [`output`]: CSV/JSON/Parquet in, CSV/JSON out
//! - [`profile`]: per-column statistics
//! - [`run`]: load → profile → transform → check → save → report orchestration
//! - [`config`] and [`error`]: config decoding and error types
//!
//! ## Example: recipe + quality rules
//!
//! ```rust
//! use std::collections::HashMap;
//!
//! use dataops_engine::pipeline::apply;
//! use dataops_engine::quality::{check, RuleSet};
//! use dataops_engine::recipe::Recipe;
//! use dataops_engine::types::{DataSet, Value};
//!
//! let sales = DataSet::from_columns(vec![
//!     ("order_id", vec![Value::Int64(1), Value::Int64(2), Value::Int64(3)]),
//!     ("region", vec![Value::str("APAC"), Value::str("EMEA"), Value::str("AMER")]),
//!     ("revenue", vec![Value::Int64(1200), Value::Int64(800), Value::Int64(-5)]),
//! ])
//! .unwrap();
//!
//! let recipe = Recipe::from_yaml_str(
//!     r#"
//! filter: "region in ['APAC', 'EMEA'] and revenue >= 0"
//! derive:
//!   - name: rev_k
//!     expr: revenue / 1000
//! "#,
//! )
//! .unwrap();
//! let out = apply(&sales, &recipe, &HashMap::new()).unwrap();
//! assert_eq!(out.row_count(), 2);
//! assert_eq!(out.column("rev_k").unwrap(), vec![Value::Float64(1.2), Value::Float64(0.8)]);
//!
//! let rules = RuleSet::from_json_str(r#"{"range": {"revenue": {"min": 0}}}"#).unwrap();
//! assert!(check(&out, &rules).passed());
//! assert!(!check(&sales, &rules).passed());
//! ```
//!
//! ## Ingesting files
//!
//! ```no_run
//! use dataops_engine::ingestion::{ingest_inferred, IngestionOptions};
//!
//! # fn main() -> Result<(), dataops_engine::IngestionError> {
//! // Column types are inferred; `.csv`, `.json`/`.ndjson` and `.parquet` are recognised.
//! let ds = ingest_inferred("data/sales.csv", &IngestionOptions::default())?;
//! println!("rows={} cols={}", ds.row_count(), ds.column_count());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod expression;
pub mod ingestion;
pub mod output;
pub mod pipeline;
pub mod processing;
pub mod profile;
pub mod quality;
pub mod recipe;
pub mod run;
pub mod types;

pub use error::{
    ConfigError, EngineError, EngineResult, IngestionError, IngestionResult, OutputError,
    PipelineError, PipelineResult, RunError,
};
