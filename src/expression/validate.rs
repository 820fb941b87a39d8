//! Allow-list lowering from [`Syntax`] to the closed [`Expr`] tree.
//!
//! Every accepted shape is matched explicitly. The final arm of [`lower`] rejects whatever is
//! left, so a construct the parser learns to recognise later is refused until it is listed here.

use super::ast::{ArithOp, CompareOp, Expr, Function, UnaryOp};
use super::error::{ExprError, ExprResult};
use super::syntax::{BinarySyntax, CompareSyntax, Syntax, UnarySyntax};
use crate::types::Value;

/// Name under which a whole-table reference may be subscripted (`df['col']`).
const TABLE_NAME: &str = "df";

pub(crate) fn lower(node: &Syntax) -> ExprResult<Expr> {
    match node {
        Syntax::Name(name) | Syntax::QuotedName(name) => Ok(Expr::Column(name.clone())),
        Syntax::Int(_)
        | Syntax::Float(_)
        | Syntax::Str(_)
        | Syntax::Bool(_)
        | Syntax::NoneLit => Ok(Expr::Literal(literal(node)?)),

        Syntax::Subscript { value, index } => match (value.as_ref(), index.as_ref()) {
            (Syntax::Name(table), Syntax::Str(column)) if table == TABLE_NAME => {
                Ok(Expr::Column(column.clone()))
            }
            _ => Err(ExprError::disallowed("[] subscript")),
        },

        Syntax::Unary { op, operand } => match op {
            UnarySyntax::Neg | UnarySyntax::Pos if is_numeric_literal(operand) => {
                Ok(Expr::Literal(literal(node)?))
            }
            UnarySyntax::Neg => Ok(Expr::Unary {
                op: UnaryOp::Neg,
                expr: Box::new(lower(operand)?),
            }),
            UnarySyntax::Not => Ok(Expr::Unary {
                op: UnaryOp::Not,
                expr: Box::new(lower(operand)?),
            }),
            UnarySyntax::Pos => Err(ExprError::disallowed("unary +")),
            UnarySyntax::Invert => Err(ExprError::disallowed("~")),
        },

        Syntax::Binary { op, left, right } => {
            let op = match op {
                BinarySyntax::Add => ArithOp::Add,
                BinarySyntax::Sub => ArithOp::Sub,
                BinarySyntax::Mul => ArithOp::Mul,
                BinarySyntax::Div => ArithOp::Div,
                BinarySyntax::FloorDiv => ArithOp::FloorDiv,
                BinarySyntax::Mod => ArithOp::Mod,
                BinarySyntax::Pow => return Err(ExprError::disallowed("**")),
                BinarySyntax::BitAnd => return Err(ExprError::disallowed("&")),
                BinarySyntax::BitOr => return Err(ExprError::disallowed("|")),
                BinarySyntax::BitXor => return Err(ExprError::disallowed("^")),
                BinarySyntax::Shl => return Err(ExprError::disallowed("<<")),
                BinarySyntax::Shr => return Err(ExprError::disallowed(">>")),
            };
            Ok(Expr::Arithmetic {
                op,
                left: Box::new(lower(left)?),
                right: Box::new(lower(right)?),
            })
        }

        Syntax::Compare { op, left, right } => {
            let op = match op {
                CompareSyntax::Eq => CompareOp::Eq,
                CompareSyntax::NotEq => CompareOp::NotEq,
                CompareSyntax::Lt => CompareOp::Lt,
                CompareSyntax::LtEq => CompareOp::LtEq,
                CompareSyntax::Gt => CompareOp::Gt,
                CompareSyntax::GtEq => CompareOp::GtEq,
                CompareSyntax::In | CompareSyntax::NotIn => {
                    return Ok(Expr::InList {
                        expr: Box::new(lower(left)?),
                        values: literal_set(right)?,
                        negated: *op == CompareSyntax::NotIn,
                    });
                }
            };
            Ok(Expr::Compare {
                op,
                left: Box::new(lower(left)?),
                right: Box::new(lower(right)?),
            })
        }

        Syntax::BoolOp { op, left, right } => Ok(Expr::Logical {
            op: *op,
            left: Box::new(lower(left)?),
            right: Box::new(lower(right)?),
        }),

        Syntax::Call {
            callee,
            args,
            keywords,
        } => {
            let func = match callee.as_ref() {
                Syntax::Name(name) => {
                    Function::from_name(name).ok_or_else(|| ExprError::disallowed(name.clone()))?
                }
                // Lowering the callee reports the offending construct (e.g. `.read`).
                other => {
                    lower(other)?;
                    return Err(ExprError::disallowed("call"));
                }
            };
            if let Some((keyword, _)) = keywords.first() {
                return Err(ExprError::disallowed(format!("{keyword}=")));
            }
            let (min, max) = func.arity();
            if args.len() < min || args.len() > max {
                return Err(ExprError::parse(format!(
                    "{}() takes {} argument(s), got {}",
                    func.name(),
                    if min == max {
                        min.to_string()
                    } else {
                        format!("{min} to {max}")
                    },
                    args.len()
                )));
            }
            let args = args.iter().map(lower).collect::<ExprResult<Vec<_>>>()?;
            Ok(Expr::Call { func, args })
        }

        Syntax::Attribute { attr, .. } => Err(ExprError::disallowed(format!(".{attr}"))),
        Syntax::Slice => Err(ExprError::disallowed("[:] slice")),
        Syntax::List(_) => Err(ExprError::disallowed("list literal")),
        Syntax::Tuple(_) => Err(ExprError::disallowed("tuple literal")),
        Syntax::Braced(_) | Syntax::DictEntry { .. } => Err(ExprError::disallowed("{}")),
        Syntax::Assign { walrus: true, .. } => Err(ExprError::disallowed(":=")),
        Syntax::Assign { walrus: false, .. } => Err(ExprError::disallowed("=")),
    }
}

fn is_numeric_literal(node: &Syntax) -> bool {
    matches!(node, Syntax::Int(_) | Syntax::Float(_))
}

/// A constant: plain literals and signed numeric literals.
fn literal(node: &Syntax) -> ExprResult<Value> {
    let value = match node {
        Syntax::Int(v) => Value::Int64(*v),
        Syntax::Float(v) => Value::Float64(*v),
        Syntax::Str(s) => Value::Utf8(s.clone()),
        Syntax::Bool(b) => Value::Bool(*b),
        Syntax::NoneLit => Value::Null,
        Syntax::Unary {
            op: UnarySyntax::Pos,
            operand,
        } if is_numeric_literal(operand) => literal(operand)?,
        Syntax::Unary {
            op: UnarySyntax::Neg,
            operand,
        } => match operand.as_ref() {
            Syntax::Int(v) => Value::Int64(v.checked_neg().ok_or_else(|| ExprError::Overflow {
                message: format!("-{v}"),
            })?),
            Syntax::Float(v) => Value::Float64(-v),
            _ => return Err(ExprError::disallowed("non-literal set element")),
        },
        _ => return Err(ExprError::disallowed("non-literal set element")),
    };
    Ok(value)
}

fn literal_set(node: &Syntax) -> ExprResult<Vec<Value>> {
    match node {
        Syntax::List(items) | Syntax::Tuple(items) => items.iter().map(literal).collect(),
        Syntax::Braced(_) => Err(ExprError::disallowed("{}")),
        _ => Err(ExprError::disallowed("in <non-literal>")),
    }
}
