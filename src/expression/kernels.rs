//! Scalar kernels.
//!
//! Both evaluation paths call exactly these functions once per (row, node), which is what
//! keeps row-at-a-time and column-at-a-time results identical.

use std::cmp::Ordering;
use std::collections::HashSet;

use super::ast::{ArithOp, CompareOp, Function, LogicalOp};
use super::error::{ExprError, ExprResult};
use crate::types::{date_part, parse_date, Value, ValueKey};

/// A literal membership set, pre-hashed.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ListSet {
    keys: HashSet<ValueKey>,
    has_null: bool,
}

impl ListSet {
    pub(crate) fn new(values: &[Value]) -> Self {
        let has_null = values.iter().any(Value::is_null);
        let keys = values
            .iter()
            .filter(|v| !v.is_null())
            .map(Value::key)
            .collect();
        Self { keys, has_null }
    }
}

fn operand_error(op: &str, left: &Value, right: &Value) -> ExprError {
    ExprError::type_mismatch(format!(
        "unsupported operand types for {op}: {} and {}",
        left.data_type(),
        right.data_type()
    ))
}

fn overflow(op: &str, left: impl std::fmt::Display, right: impl std::fmt::Display) -> ExprError {
    ExprError::Overflow {
        message: format!("{left} {op} {right}"),
    }
}

pub(crate) fn negate(v: &Value) -> ExprResult<Value> {
    match v {
        Value::Null => Ok(Value::Null),
        Value::Int64(i) => i
            .checked_neg()
            .map(Value::Int64)
            .ok_or_else(|| ExprError::Overflow {
                message: format!("-({i})"),
            }),
        Value::Float64(f) => Ok(Value::Float64(-f)),
        other => Err(ExprError::type_mismatch(format!(
            "bad operand type for unary -: {}",
            other.data_type()
        ))),
    }
}

pub(crate) fn not(v: &Value) -> ExprResult<Value> {
    match v {
        Value::Null => Ok(Value::Null),
        Value::Bool(b) => Ok(Value::Bool(!b)),
        other => Err(ExprError::type_mismatch(format!(
            "'not' expects bool, got {}",
            other.data_type()
        ))),
    }
}

pub(crate) fn arithmetic(op: ArithOp, left: &Value, right: &Value) -> ExprResult<Value> {
    match (left, right) {
        (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
        (Value::Int64(a), Value::Int64(b)) => int_arithmetic(op, *a, *b),
        (Value::Utf8(a), Value::Utf8(b)) if op == ArithOp::Add => {
            Ok(Value::Utf8(format!("{a}{b}")))
        }
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => Ok(float_arithmetic(op, a, b)),
            _ => Err(operand_error(op.symbol(), left, right)),
        },
    }
}

fn int_arithmetic(op: ArithOp, a: i64, b: i64) -> ExprResult<Value> {
    let result = match op {
        ArithOp::Add => a.checked_add(b),
        ArithOp::Sub => a.checked_sub(b),
        ArithOp::Mul => a.checked_mul(b),
        ArithOp::Div if b == 0 => return Ok(Value::Null),
        ArithOp::Div => return Ok(Value::Float64(a as f64 / b as f64)),
        ArithOp::FloorDiv | ArithOp::Mod if b == 0 => return Ok(Value::Null),
        ArithOp::FloorDiv => a.checked_div(b).map(|q| {
            if a % b != 0 && ((a < 0) != (b < 0)) {
                q - 1
            } else {
                q
            }
        }),
        ArithOp::Mod => a.checked_rem(b).map(|r| {
            if r != 0 && ((r < 0) != (b < 0)) {
                r + b
            } else {
                r
            }
        }),
    };
    result
        .map(Value::Int64)
        .ok_or_else(|| overflow(op.symbol(), a, b))
}

fn float_arithmetic(op: ArithOp, a: f64, b: f64) -> Value {
    let result = match op {
        ArithOp::Add => a + b,
        ArithOp::Sub => a - b,
        ArithOp::Mul => a * b,
        ArithOp::Div | ArithOp::FloorDiv | ArithOp::Mod if b == 0.0 => return Value::Null,
        ArithOp::Div => a / b,
        ArithOp::FloorDiv => (a / b).floor(),
        ArithOp::Mod => {
            let r = a % b;
            if r != 0.0 && ((r < 0.0) != (b < 0.0)) {
                r + b
            } else {
                r
            }
        }
    };
    Value::Float64(result)
}

/// Ordering for comparable pairs, or `Ok(None)` when NaN is involved.
fn compare_values(left: &Value, right: &Value) -> ExprResult<Option<Ordering>> {
    match (left, right) {
        (Value::Date(d), Value::Utf8(s)) => Ok(Some(d.cmp(&date_literal(s)?))),
        (Value::Utf8(s), Value::Date(d)) => Ok(Some(date_literal(s)?.cmp(d))),
        _ if left.is_orderable_with(right) => Ok(left.partial_cmp_value(right)),
        _ => Err(operand_error("comparison", left, right)),
    }
}

fn date_literal(s: &str) -> ExprResult<chrono::NaiveDate> {
    parse_date(s).ok_or_else(|| ExprError::type_mismatch(format!("cannot compare date with '{s}'")))
}

pub(crate) fn compare(op: CompareOp, left: &Value, right: &Value) -> ExprResult<Value> {
    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }
    let result = match compare_values(left, right)? {
        None => op == CompareOp::NotEq,
        Some(ord) => match op {
            CompareOp::Eq => ord == Ordering::Equal,
            CompareOp::NotEq => ord != Ordering::Equal,
            CompareOp::Lt => ord == Ordering::Less,
            CompareOp::LtEq => ord != Ordering::Greater,
            CompareOp::Gt => ord == Ordering::Greater,
            CompareOp::GtEq => ord != Ordering::Less,
        },
    };
    Ok(Value::Bool(result))
}

fn truth(op: LogicalOp, v: &Value) -> ExprResult<Option<bool>> {
    match v {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(*b)),
        other => Err(ExprError::type_mismatch(format!(
            "'{}' expects bool operands, got {}",
            match op {
                LogicalOp::And => "and",
                LogicalOp::Or => "or",
            },
            other.data_type()
        ))),
    }
}

/// Kleene three-valued `and` / `or`.
pub(crate) fn logical(op: LogicalOp, left: &Value, right: &Value) -> ExprResult<Value> {
    let (a, b) = (truth(op, left)?, truth(op, right)?);
    let result = match op {
        LogicalOp::And => match (a, b) {
            (Some(false), _) | (_, Some(false)) => Some(false),
            (Some(true), Some(true)) => Some(true),
            _ => None,
        },
        LogicalOp::Or => match (a, b) {
            (Some(true), _) | (_, Some(true)) => Some(true),
            (Some(false), Some(false)) => Some(false),
            _ => None,
        },
    };
    Ok(result.map(Value::Bool).unwrap_or(Value::Null))
}

/// SQL `IN`: unknown when the value is null or the set holds a null and nothing matched.
pub(crate) fn in_list(v: &Value, set: &ListSet, negated: bool) -> Value {
    let found = if v.is_null() {
        set.has_null.then_some(true)
    } else if set.keys.contains(&v.key()) {
        Some(true)
    } else if set.has_null {
        None
    } else {
        Some(false)
    };
    match found {
        Some(b) => Value::Bool(b != negated),
        None => Value::Null,
    }
}

fn arg_error(func: Function, v: &Value) -> ExprError {
    ExprError::type_mismatch(format!("{}() does not accept {}", func.name(), v.data_type()))
}

pub(crate) fn call(func: Function, args: &[Value]) -> ExprResult<Value> {
    let Some(v) = args.first() else {
        return Err(ExprError::parse(format!("{}() takes at least one argument", func.name())));
    };
    if v.is_null() {
        return Ok(Value::Null);
    }

    match func {
        Function::Abs => match v {
            Value::Int64(i) => i.checked_abs().map(Value::Int64).ok_or_else(|| ExprError::Overflow {
                message: format!("abs({i})"),
            }),
            Value::Float64(f) => Ok(Value::Float64(f.abs())),
            other => Err(arg_error(func, other)),
        },
        Function::Round => {
            let ndigits = match args.get(1) {
                None => 0,
                Some(Value::Null) => return Ok(Value::Null),
                Some(Value::Int64(n)) => *n,
                Some(other) => {
                    return Err(ExprError::type_mismatch(format!(
                        "round() ndigits must be int64, got {}",
                        other.data_type()
                    )));
                }
            };
            match v {
                Value::Int64(i) => round_int(*i, ndigits).map(Value::Int64),
                Value::Float64(f) => Ok(Value::Float64(round_float(*f, ndigits))),
                other => Err(arg_error(func, other)),
            }
        }
        Function::Lower | Function::Upper | Function::Strip => match v {
            Value::Utf8(s) => Ok(Value::Utf8(match func {
                Function::Lower => s.to_lowercase(),
                Function::Upper => s.to_uppercase(),
                _ => s.trim().to_string(),
            })),
            other => Err(arg_error(func, other)),
        },
        Function::Year | Function::Month | Function::Day => {
            let date = match v {
                Value::Date(d) => *d,
                Value::Utf8(s) => parse_date(s).ok_or_else(|| arg_error(func, v))?,
                other => return Err(arg_error(func, other)),
            };
            match func.date_part() {
                Some(part) => Ok(Value::Int64(date_part(date, part))),
                None => Err(arg_error(func, v)),
            }
        }
        Function::Date => match v {
            Value::Date(d) => Ok(Value::Date(*d)),
            Value::Utf8(s) => parse_date(s).map(Value::Date).ok_or_else(|| {
                ExprError::type_mismatch(format!("date() cannot parse '{s}' as YYYY-MM-DD"))
            }),
            other => Err(arg_error(func, other)),
        },
        Function::Str => Ok(Value::Utf8(v.to_string())),
        Function::Int => match v {
            Value::Int64(i) => Ok(Value::Int64(*i)),
            Value::Bool(b) => Ok(Value::Int64(i64::from(*b))),
            Value::Float64(f) => float_to_int(*f),
            Value::Utf8(s) => s.trim().parse::<i64>().map(Value::Int64).map_err(|_| {
                ExprError::type_mismatch(format!("int() cannot parse '{s}'"))
            }),
            other => Err(arg_error(func, other)),
        },
        Function::Float => match v {
            Value::Int64(i) => Ok(Value::Float64(*i as f64)),
            Value::Float64(f) => Ok(Value::Float64(*f)),
            Value::Bool(b) => Ok(Value::Float64(if *b { 1.0 } else { 0.0 })),
            Value::Utf8(s) => s.trim().parse::<f64>().map(Value::Float64).map_err(|_| {
                ExprError::type_mismatch(format!("float() cannot parse '{s}'"))
            }),
            other => Err(arg_error(func, other)),
        },
    }
}

fn float_to_int(f: f64) -> ExprResult<Value> {
    if !f.is_finite() {
        return Err(ExprError::type_mismatch(format!("int() cannot convert {f}")));
    }
    let t = f.trunc();
    if t < -9_223_372_036_854_775_808.0 || t >= 9_223_372_036_854_775_808.0 {
        return Err(ExprError::Overflow {
            message: format!("int({f})"),
        });
    }
    Ok(Value::Int64(t as i64))
}

/// Round an integer to `ndigits` (only negative `ndigits` change it), ties to even.
fn round_int(i: i64, ndigits: i64) -> ExprResult<i64> {
    if ndigits >= 0 {
        return Ok(i);
    }
    if ndigits < -18 {
        return Ok(0);
    }
    let p = 10_i128.pow((-ndigits) as u32);
    let v = i128::from(i);
    let (mut q, r) = (v.div_euclid(p), v.rem_euclid(p));
    if 2 * r > p || (2 * r == p && q % 2 != 0) {
        q += 1;
    }
    i64::try_from(q * p).map_err(|_| ExprError::Overflow {
        message: format!("round({i}, {ndigits})"),
    })
}

fn round_float(f: f64, ndigits: i64) -> f64 {
    if !f.is_finite() {
        return f;
    }
    let n = ndigits.clamp(-308, 308) as i32;
    let scaled = if n >= 0 {
        let m = 10_f64.powi(n);
        (f * m).round_ties_even() / m
    } else {
        let m = 10_f64.powi(-n);
        (f / m).round_ties_even() * m
    };
    if scaled.is_finite() { scaled } else { f }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn b(v: bool) -> Value {
        Value::Bool(v)
    }

    #[test]
    fn integer_arithmetic_stays_integral_except_true_division() {
        assert_eq!(
            arithmetic(ArithOp::Add, &Value::Int64(2), &Value::Int64(3)).unwrap(),
            Value::Int64(5)
        );
        assert_eq!(
            arithmetic(ArithOp::Div, &Value::Int64(3), &Value::Int64(2)).unwrap(),
            Value::Float64(1.5)
        );
        assert_eq!(
            arithmetic(ArithOp::Mul, &Value::Int64(2), &Value::Float64(0.5)).unwrap(),
            Value::Float64(1.0)
        );
    }

    #[test]
    fn floor_division_and_modulo_follow_the_divisor_sign() {
        let floordiv = |a, b| arithmetic(ArithOp::FloorDiv, &Value::Int64(a), &Value::Int64(b));
        let modulo = |a, b| arithmetic(ArithOp::Mod, &Value::Int64(a), &Value::Int64(b));
        assert_eq!(floordiv(7, 2).unwrap(), Value::Int64(3));
        assert_eq!(floordiv(-7, 2).unwrap(), Value::Int64(-4));
        assert_eq!(modulo(-7, 2).unwrap(), Value::Int64(1));
        assert_eq!(modulo(7, -2).unwrap(), Value::Int64(-1));
        assert_eq!(
            arithmetic(ArithOp::Mod, &Value::Float64(-7.5), &Value::Int64(2)).unwrap(),
            Value::Float64(0.5)
        );
    }

    #[test]
    fn division_by_zero_is_null() {
        for op in [ArithOp::Div, ArithOp::FloorDiv, ArithOp::Mod] {
            assert_eq!(
                arithmetic(op, &Value::Int64(1), &Value::Int64(0)).unwrap(),
                Value::Null
            );
            assert_eq!(
                arithmetic(op, &Value::Float64(1.0), &Value::Float64(0.0)).unwrap(),
                Value::Null
            );
        }
    }

    #[test]
    fn overflow_and_type_errors() {
        assert!(matches!(
            arithmetic(ArithOp::Add, &Value::Int64(i64::MAX), &Value::Int64(1)),
            Err(ExprError::Overflow { .. })
        ));
        assert!(matches!(
            arithmetic(ArithOp::FloorDiv, &Value::Int64(i64::MIN), &Value::Int64(-1)),
            Err(ExprError::Overflow { .. })
        ));
        assert!(matches!(
            arithmetic(ArithOp::Sub, &Value::str("a"), &Value::str("b")),
            Err(ExprError::TypeMismatch { .. })
        ));
        assert_eq!(
            arithmetic(ArithOp::Add, &Value::str("a"), &Value::str("b")).unwrap(),
            Value::str("ab")
        );
        assert_eq!(
            arithmetic(ArithOp::Add, &Value::Null, &Value::str("b")).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn comparisons() {
        assert_eq!(
            compare(CompareOp::Eq, &Value::Int64(1), &Value::Float64(1.0)).unwrap(),
            b(true)
        );
        assert_eq!(
            compare(CompareOp::Lt, &Value::str("a"), &Value::str("b")).unwrap(),
            b(true)
        );
        assert_eq!(
            compare(CompareOp::Gt, &Value::Null, &Value::Int64(1)).unwrap(),
            Value::Null
        );
        let nan = Value::Float64(f64::NAN);
        assert_eq!(compare(CompareOp::Eq, &nan, &nan).unwrap(), b(false));
        assert_eq!(compare(CompareOp::NotEq, &nan, &nan).unwrap(), b(true));
        assert!(compare(CompareOp::Eq, &Value::Int64(1), &Value::str("1")).is_err());

        let d = Value::Date(NaiveDate::from_ymd_opt(2025, 1, 2).unwrap());
        assert_eq!(
            compare(CompareOp::GtEq, &d, &Value::str("2025-01-01")).unwrap(),
            b(true)
        );
        assert!(compare(CompareOp::GtEq, &d, &Value::str("yesterday")).is_err());
    }

    #[test]
    fn kleene_truth_tables() {
        let n = Value::Null;
        let and = |l: &Value, r: &Value| logical(LogicalOp::And, l, r).unwrap();
        let or = |l: &Value, r: &Value| logical(LogicalOp::Or, l, r).unwrap();
        assert_eq!(and(&n, &b(false)), b(false));
        assert_eq!(and(&b(false), &n), b(false));
        assert_eq!(and(&n, &b(true)), Value::Null);
        assert_eq!(and(&n, &n), Value::Null);
        assert_eq!(and(&b(true), &b(true)), b(true));
        assert_eq!(or(&n, &b(true)), b(true));
        assert_eq!(or(&b(true), &n), b(true));
        assert_eq!(or(&n, &b(false)), Value::Null);
        assert_eq!(or(&b(false), &b(false)), b(false));
        assert_eq!(not(&n).unwrap(), Value::Null);
        assert!(logical(LogicalOp::And, &Value::Int64(1), &b(true)).is_err());
    }

    #[test]
    fn membership_is_sql_like() {
        let plain = ListSet::new(&[Value::str("APAC"), Value::Int64(1)]);
        let with_null = ListSet::new(&[Value::str("APAC"), Value::Null]);

        assert_eq!(in_list(&Value::str("APAC"), &plain, false), b(true));
        assert_eq!(in_list(&Value::Float64(1.0), &plain, false), b(true));
        assert_eq!(in_list(&Value::str("EMEA"), &plain, false), b(false));
        assert_eq!(in_list(&Value::str("EMEA"), &plain, true), b(true));
        assert_eq!(in_list(&Value::Null, &plain, false), Value::Null);
        assert_eq!(in_list(&Value::Null, &with_null, false), b(true));
        assert_eq!(in_list(&Value::str("EMEA"), &with_null, false), Value::Null);
        assert_eq!(in_list(&Value::str("EMEA"), &with_null, true), Value::Null);
    }

    #[test]
    fn rounding_ties_to_even() {
        assert_eq!(call(Function::Round, &[Value::Float64(2.5)]).unwrap(), Value::Float64(2.0));
        assert_eq!(call(Function::Round, &[Value::Float64(3.5)]).unwrap(), Value::Float64(4.0));
        assert_eq!(
            call(Function::Round, &[Value::Float64(1.2345), Value::Int64(2)]).unwrap(),
            Value::Float64(1.23)
        );
        assert_eq!(
            call(Function::Round, &[Value::Int64(1250), Value::Int64(-2)]).unwrap(),
            Value::Int64(1200)
        );
        assert_eq!(
            call(Function::Round, &[Value::Int64(1350), Value::Int64(-2)]).unwrap(),
            Value::Int64(1400)
        );
        assert_eq!(call(Function::Round, &[Value::Int64(7)]).unwrap(), Value::Int64(7));
    }

    #[test]
    fn string_date_and_cast_functions() {
        assert_eq!(call(Function::Upper, &[Value::str("apac")]).unwrap(), Value::str("APAC"));
        assert_eq!(call(Function::Strip, &[Value::str("  x ")]).unwrap(), Value::str("x"));
        assert_eq!(call(Function::Lower, &[Value::Null]).unwrap(), Value::Null);
        assert!(call(Function::Lower, &[Value::Int64(1)]).is_err());

        let d = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        assert_eq!(call(Function::Date, &[Value::str("2025-03-09")]).unwrap(), Value::Date(d));
        assert_eq!(call(Function::Month, &[Value::Date(d)]).unwrap(), Value::Int64(3));
        assert_eq!(call(Function::Year, &[Value::str("2025-03-09")]).unwrap(), Value::Int64(2025));
        assert!(call(Function::Date, &[Value::str("March 9")]).is_err());

        assert_eq!(call(Function::Int, &[Value::Float64(-2.7)]).unwrap(), Value::Int64(-2));
        assert_eq!(call(Function::Int, &[Value::str(" 42 ")]).unwrap(), Value::Int64(42));
        assert_eq!(call(Function::Float, &[Value::Bool(true)]).unwrap(), Value::Float64(1.0));
        assert_eq!(call(Function::Str, &[Value::Float64(2.0)]).unwrap(), Value::str("2.0"));
        assert_eq!(call(Function::Abs, &[Value::Int64(-3)]).unwrap(), Value::Int64(3));
    }
}
