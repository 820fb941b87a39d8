//! Restricted expression language for filter predicates and derived columns.
//!
//! Source text goes through four stages:
//!
//! 1. tokenizing (Python-flavoured literals, operators and keywords),
//! 2. parsing into a general syntax tree,
//! 3. an allow-list walk lowering that tree into the closed [`Expr`] type, rejecting every
//!    construct it does not list with [`ExprError::DisallowedConstruct`],
//! 4. binding column names against a [`Schema`] before any row is touched.
//!
//! Evaluation is pure and deterministic. Row-at-a-time and column-at-a-time evaluation share
//! their scalar kernels, and `and`/`or` never short-circuit, so both produce the same values.
//!
//! ```rust
//! use dataops_engine::expression::{evaluate, EvalContext, Evaluated, Expression};
//! use dataops_engine::types::{DataSet, Value};
//!
//! let ds = DataSet::from_columns(vec![
//!     ("region", vec![Value::str("APAC"), Value::str("AMER")]),
//!     ("revenue", vec![Value::Int64(1200), Value::Int64(-5)]),
//! ])
//! .unwrap();
//!
//! let expr: Expression = "region in ['APAC', 'EMEA'] and revenue >= 0".parse().unwrap();
//! let out = evaluate(&expr, EvalContext::Table(&ds)).unwrap();
//! assert_eq!(
//!     out,
//!     Evaluated::Column(vec![Value::Bool(true), Value::Bool(false)])
//! );
//!
//! assert!(Expression::parse("df.revenue").is_err());
//! ```

mod ast;
mod error;
mod eval;
mod kernels;
mod lexer;
mod syntax;
mod validate;

use std::fmt;
use std::str::FromStr;

pub use ast::{ArithOp, CompareOp, Expr, Function, LogicalOp, UnaryOp};
pub use error::{ExprError, ExprResult};
pub use eval::BoundExpr;

use crate::types::{DataSet, Schema, Value};

/// A parsed and validated expression, together with its source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    expr: Expr,
}

impl Expression {
    /// Parse and validate `source`.
    pub fn parse(source: &str) -> ExprResult<Self> {
        let tokens = lexer::tokenize(source)?;
        let tree = syntax::parse(&tokens)?;
        let expr = validate::lower(&tree)?;
        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Resolve column references against `schema`.
    ///
    /// Fails with [`ExprError::UnknownColumn`] for the first unresolved name, even when the
    /// dataset has no rows.
    pub fn bind(&self, schema: &Schema) -> ExprResult<BoundExpr> {
        BoundExpr::bind(&self.expr, schema)
    }
}

impl FromStr for Expression {
    type Err = ExprError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// What an expression is evaluated against.
#[derive(Debug, Clone, Copy)]
pub enum EvalContext<'a> {
    /// A single row laid out as `schema`.
    Row { schema: &'a Schema, row: &'a [Value] },
    /// Every row of a dataset.
    Table(&'a DataSet),
}

/// Result of [`evaluate`]: a scalar for a row context, a column for a table context.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluated {
    Scalar(Value),
    Column(Vec<Value>),
}

/// Bind and evaluate `expr` in `ctx`.
pub fn evaluate(expr: &Expression, ctx: EvalContext<'_>) -> ExprResult<Evaluated> {
    match ctx {
        EvalContext::Row { schema, row } => expr.bind(schema)?.eval_row(row).map(Evaluated::Scalar),
        EvalContext::Table(ds) => expr
            .bind(&ds.schema)?
            .eval_column(ds)
            .map(Evaluated::Column),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DataSet;

    fn sales() -> DataSet {
        DataSet::from_columns(vec![
            ("order_id", vec![1, 2, 3, 4, 1].into_iter().map(Value::Int64).collect()),
            (
                "region",
                ["APAC", "EMEA", "APAC", "AMER", "APAC"]
                    .into_iter()
                    .map(Value::str)
                    .collect(),
            ),
            (
                "revenue",
                vec![
                    Value::Int64(1000),
                    Value::Int64(800),
                    Value::Int64(700),
                    Value::Null,
                    Value::Int64(500),
                ],
            ),
            (
                "flag",
                vec![
                    Value::Bool(true),
                    Value::Null,
                    Value::Bool(false),
                    Value::Bool(true),
                    Value::Null,
                ],
            ),
        ])
        .unwrap()
    }

    fn row_results(expr: &Expression, ds: &DataSet) -> ExprResult<Vec<Value>> {
        let bound = expr.bind(&ds.schema)?;
        ds.rows.iter().map(|r| bound.eval_row(r)).collect()
    }

    #[test]
    fn column_errors_name_the_first_failing_row() {
        let ds = DataSet::from_columns(vec![
            ("a", vec![Value::str("1"), Value::str("x")]),
            ("b", vec![Value::str("y"), Value::str("2")]),
        ])
        .unwrap();
        let expr: Expression = "int(a) + int(b)".parse().unwrap();
        let bound = expr.bind(&ds.schema).unwrap();

        let first_row = bound.eval_row(&ds.rows[0]).unwrap_err();
        assert_ne!(first_row, bound.eval_row(&ds.rows[1]).unwrap_err());
        assert_eq!(bound.eval_column(&ds).unwrap_err(), first_row);
    }

    #[test]
    fn row_and_vectorized_evaluation_agree() {
        let ds = sales();
        for src in [
            "revenue / 1000",
            "revenue // 300 + order_id % 2",
            "-revenue * 2",
            "region in ['APAC', 'EMEA'] and revenue >= 0",
            "flag or revenue > 750",
            "not flag and region != 'AMER'",
            "region not in ('APAC', None)",
            "round(revenue / 3, 1)",
            "upper(region) + '-' + str(order_id)",
            "abs(-3) + 1",
            "flag and False",
        ] {
            let expr = Expression::parse(src).unwrap();
            let rows = row_results(&expr, &ds).unwrap();
            let Evaluated::Column(column) = evaluate(&expr, EvalContext::Table(&ds)).unwrap()
            else {
                panic!("table context yields a column");
            };
            assert_eq!(rows, column, "{src}");
        }
    }

    #[test]
    fn unknown_columns_fail_at_bind_time_even_without_rows() {
        let ds = sales();
        let empty = DataSet::new(ds.schema.clone(), vec![]);
        let expr = Expression::parse("price * 2").unwrap();
        assert_eq!(
            evaluate(&expr, EvalContext::Table(&empty)).unwrap_err(),
            ExprError::UnknownColumn {
                name: "price".into()
            }
        );
    }

    #[test]
    fn row_context_yields_scalar() {
        let ds = sales();
        let expr = Expression::parse("revenue > 750").unwrap();
        let out = evaluate(
            &expr,
            EvalContext::Row {
                schema: &ds.schema,
                row: &ds.rows[1],
            },
        )
        .unwrap();
        assert_eq!(out, Evaluated::Scalar(Value::Bool(true)));
    }

    #[test]
    fn evaluation_is_repeatable() {
        let ds = sales();
        let expr = Expression::parse("revenue * 1.5 - order_id").unwrap();
        let first = evaluate(&expr, EvalContext::Table(&ds)).unwrap();
        let second = evaluate(&expr, EvalContext::Table(&ds)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn display_and_columns() {
        let expr: Expression = "revenue / 1000 + df['order_id']".parse().unwrap();
        assert_eq!(expr.to_string(), "revenue / 1000 + df['order_id']");
        assert_eq!(expr.expr().columns(), vec!["revenue", "order_id"]);
    }
}
