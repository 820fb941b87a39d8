//! Schema-bound evaluation: one row at a time, or one node at a time over whole columns.

use super::ast::{ArithOp, CompareOp, Expr, Function, LogicalOp, UnaryOp};
use super::error::{ExprError, ExprResult};
use super::kernels::{self, ListSet};
use crate::types::{DataSet, Schema, Value};

/// An [`Expr`] whose column references have been resolved to positions in a [`Schema`].
#[derive(Debug, Clone, PartialEq)]
pub struct BoundExpr {
    node: Node,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Column(usize),
    Literal(Value),
    Neg(Box<Node>),
    Not(Box<Node>),
    Arithmetic(ArithOp, Box<Node>, Box<Node>),
    Compare(CompareOp, Box<Node>, Box<Node>),
    Logical(LogicalOp, Box<Node>, Box<Node>),
    InList(Box<Node>, ListSet, bool),
    Call(Function, Vec<Node>),
}

impl BoundExpr {
    /// Resolve every column of `expr` against `schema`.
    pub(crate) fn bind(expr: &Expr, schema: &Schema) -> ExprResult<Self> {
        Ok(Self {
            node: bind_node(expr, schema)?,
        })
    }

    /// Evaluate against a single row laid out as `schema` was.
    pub fn eval_row(&self, row: &[Value]) -> ExprResult<Value> {
        eval_row(&self.node, row)
    }

    /// Evaluate against every row of `dataset`, returning one value per row.
    ///
    /// Zero-row datasets yield an empty column without running any kernel, matching what
    /// row-at-a-time evaluation does. On failure the error is the one raised by the lowest
    /// failing row, again as row-at-a-time evaluation reports it.
    pub fn eval_column(&self, dataset: &DataSet) -> ExprResult<Vec<Value>> {
        let n = dataset.row_count();
        if n == 0 {
            return Ok(Vec::new());
        }
        let vector = match eval_vector(&self.node, dataset) {
            Ok(vector) => vector,
            Err(err) => {
                // Node-at-a-time evaluation fails at the first failing node, not row.
                for row in &dataset.rows {
                    eval_row(&self.node, row)?;
                }
                return Err(err);
            }
        };
        Ok(match vector {
            Vector::Scalar(v) => vec![v; n],
            Vector::Values(values) => values,
        })
    }
}

fn bind_node(expr: &Expr, schema: &Schema) -> ExprResult<Node> {
    let bind = |e: &Expr| bind_node(e, schema).map(Box::new);
    Ok(match expr {
        Expr::Column(name) => Node::Column(
            schema
                .index_of(name)
                .ok_or_else(|| ExprError::UnknownColumn { name: name.clone() })?,
        ),
        Expr::Literal(v) => Node::Literal(v.clone()),
        Expr::Unary { op: UnaryOp::Neg, expr } => Node::Neg(bind(expr)?),
        Expr::Unary { op: UnaryOp::Not, expr } => Node::Not(bind(expr)?),
        Expr::Arithmetic { op, left, right } => Node::Arithmetic(*op, bind(left)?, bind(right)?),
        Expr::Compare { op, left, right } => Node::Compare(*op, bind(left)?, bind(right)?),
        Expr::Logical { op, left, right } => Node::Logical(*op, bind(left)?, bind(right)?),
        Expr::InList {
            expr,
            values,
            negated,
        } => Node::InList(bind(expr)?, ListSet::new(values), *negated),
        Expr::Call { func, args } => Node::Call(
            *func,
            args.iter()
                .map(|a| bind_node(a, schema))
                .collect::<ExprResult<_>>()?,
        ),
    })
}

fn eval_row(node: &Node, row: &[Value]) -> ExprResult<Value> {
    match node {
        Node::Column(idx) => Ok(row.get(*idx).cloned().unwrap_or(Value::Null)),
        Node::Literal(v) => Ok(v.clone()),
        Node::Neg(e) => kernels::negate(&eval_row(e, row)?),
        Node::Not(e) => kernels::not(&eval_row(e, row)?),
        Node::Arithmetic(op, l, r) => {
            kernels::arithmetic(*op, &eval_row(l, row)?, &eval_row(r, row)?)
        }
        Node::Compare(op, l, r) => kernels::compare(*op, &eval_row(l, row)?, &eval_row(r, row)?),
        // Both sides are always evaluated; see the vectorized path.
        Node::Logical(op, l, r) => kernels::logical(*op, &eval_row(l, row)?, &eval_row(r, row)?),
        Node::InList(e, set, negated) => Ok(kernels::in_list(&eval_row(e, row)?, set, *negated)),
        Node::Call(func, args) => {
            let args = args
                .iter()
                .map(|a| eval_row(a, row))
                .collect::<ExprResult<Vec<_>>>()?;
            kernels::call(*func, &args)
        }
    }
}

/// Intermediate result of vectorized evaluation; literals stay scalar until combined.
enum Vector {
    Scalar(Value),
    Values(Vec<Value>),
}

impl Vector {
    fn get(&self, i: usize) -> &Value {
        match self {
            Vector::Scalar(v) => v,
            Vector::Values(values) => &values[i],
        }
    }

    fn is_scalar(&self) -> bool {
        matches!(self, Vector::Scalar(_))
    }
}

fn unary<F>(input: Vector, f: F) -> ExprResult<Vector>
where
    F: Fn(&Value) -> ExprResult<Value>,
{
    match input {
        Vector::Scalar(v) => Ok(Vector::Scalar(f(&v)?)),
        Vector::Values(values) => values.iter().map(f).collect::<ExprResult<_>>().map(Vector::Values),
    }
}

fn binary<F>(left: Vector, right: Vector, n: usize, f: F) -> ExprResult<Vector>
where
    F: Fn(&Value, &Value) -> ExprResult<Value>,
{
    if left.is_scalar() && right.is_scalar() {
        return Ok(Vector::Scalar(f(left.get(0), right.get(0))?));
    }
    (0..n)
        .map(|i| f(left.get(i), right.get(i)))
        .collect::<ExprResult<_>>()
        .map(Vector::Values)
}

fn eval_vector(node: &Node, dataset: &DataSet) -> ExprResult<Vector> {
    let n = dataset.row_count();
    match node {
        Node::Column(idx) => Ok(Vector::Values(dataset.column_values(*idx).cloned().collect())),
        Node::Literal(v) => Ok(Vector::Scalar(v.clone())),
        Node::Neg(e) => unary(eval_vector(e, dataset)?, kernels::negate),
        Node::Not(e) => unary(eval_vector(e, dataset)?, kernels::not),
        Node::Arithmetic(op, l, r) => binary(
            eval_vector(l, dataset)?,
            eval_vector(r, dataset)?,
            n,
            |a, b| kernels::arithmetic(*op, a, b),
        ),
        Node::Compare(op, l, r) => binary(
            eval_vector(l, dataset)?,
            eval_vector(r, dataset)?,
            n,
            |a, b| kernels::compare(*op, a, b),
        ),
        Node::Logical(op, l, r) => binary(
            eval_vector(l, dataset)?,
            eval_vector(r, dataset)?,
            n,
            |a, b| kernels::logical(*op, a, b),
        ),
        Node::InList(e, set, negated) => unary(eval_vector(e, dataset)?, |v| {
            Ok(kernels::in_list(v, set, *negated))
        }),
        Node::Call(func, args) => {
            let args = args
                .iter()
                .map(|a| eval_vector(a, dataset))
                .collect::<ExprResult<Vec<_>>>()?;
            if args.iter().all(Vector::is_scalar) {
                let scalars: Vec<Value> = args.iter().map(|a| a.get(0).clone()).collect();
                return kernels::call(*func, &scalars).map(Vector::Scalar);
            }
            (0..n)
                .map(|i| {
                    let row_args: Vec<Value> = args.iter().map(|a| a.get(i).clone()).collect();
                    kernels::call(*func, &row_args)
                })
                .collect::<ExprResult<_>>()
                .map(Vector::Values)
        }
    }
}
