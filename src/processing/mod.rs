//! In-memory dataset transformations.
//!
//! Each function takes its input by reference and returns a new [`crate::types::DataSet`].
//! These are the kernels behind the recipe steps in [`crate::pipeline`]:
//!
//! - [`select()`]: column projection
//! - [`filter()`]: row filtering by a boolean [`Expression`]
//! - [`derive()`]: computed columns
//! - [`join()`]: equi-joins (inner/left/right/outer)
//! - [`groupby()`]: grouped aggregation with [`AggFunc`]s
//! - [`reduce()`]: whole-column aggregation
//!
//! ## Example: filter → derive → groupby
//!
//! ```rust
//! use dataops_engine::expression::Expression;
//! use dataops_engine::processing::{derive, filter, groupby, AggFunc, Aggregation};
//! use dataops_engine::types::{DataSet, Value};
//!
//! let ds = DataSet::from_columns(vec![
//!     ("region", vec![Value::str("APAC"), Value::str("EMEA"), Value::str("APAC")]),
//!     ("revenue", vec![Value::Int64(1200), Value::Int64(800), Value::Int64(-5)]),
//! ])
//! .unwrap();
//!
//! let kept = filter(&ds, &"revenue >= 0".parse::<Expression>().unwrap()).unwrap();
//! let derived = derive(&kept, "rev_k", &"revenue / 1000".parse().unwrap()).unwrap();
//! let grouped = groupby(&derived, &["region"], &[Aggregation::new("rev_k", AggFunc::Sum)]).unwrap();
//!
//! assert_eq!(grouped.rows[0], vec![Value::str("APAC"), Value::Float64(1.2)]);
//! ```

pub mod aggregate;
pub mod derive;
pub mod filter;
pub mod groupby;
pub mod join;
pub mod select;

pub use aggregate::{reduce, AggFunc};
pub use derive::derive;
pub use filter::filter;
pub use groupby::{groupby, Aggregation};
pub use join::{join, JoinKind};
pub use select::select;

use crate::error::EngineError;
use crate::expression::{ExprError, Expression};

pub(crate) fn expression_error(expr: &Expression, source: ExprError) -> EngineError {
    EngineError::Expression {
        expr: expr.source().to_string(),
        source,
    }
}
