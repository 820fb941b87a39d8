//! The closed expression tree.
//!
//! Only [`super::validate`] builds these from source text. Anything that cannot be expressed
//! with the variants below is unrepresentable, so evaluation has nothing to guard against.

use crate::types::{DatePart, Value};

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Numeric negation (`-x`).
    Neg,
    /// Boolean negation (`not x`), three-valued.
    Not,
}

/// Arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    /// True division; always yields a float.
    Div,
    /// Floor division (`//`).
    FloorDiv,
    /// Floor modulo (`%`); the result takes the sign of the divisor.
    Mod,
}

impl ArithOp {
    pub fn symbol(self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
            ArithOp::FloorDiv => "//",
            ArithOp::Mod => "%",
        }
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::NotEq => "!=",
            CompareOp::Lt => "<",
            CompareOp::LtEq => "<=",
            CompareOp::Gt => ">",
            CompareOp::GtEq => ">=",
        }
    }
}

/// Boolean connectives, evaluated with three-valued logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

/// Whitelisted pure functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Abs,
    Round,
    Lower,
    Upper,
    Strip,
    Year,
    Month,
    Day,
    Date,
    Str,
    Int,
    Float,
}

impl Function {
    /// Look up a callable name. This is the complete whitelist.
    pub fn from_name(name: &str) -> Option<Self> {
        let func = match name {
            "abs" => Function::Abs,
            "round" => Function::Round,
            "lower" => Function::Lower,
            "upper" => Function::Upper,
            "strip" | "trim" => Function::Strip,
            "year" => Function::Year,
            "month" => Function::Month,
            "day" => Function::Day,
            "date" => Function::Date,
            "str" => Function::Str,
            "int" => Function::Int,
            "float" => Function::Float,
            _ => return None,
        };
        Some(func)
    }

    pub fn name(self) -> &'static str {
        match self {
            Function::Abs => "abs",
            Function::Round => "round",
            Function::Lower => "lower",
            Function::Upper => "upper",
            Function::Strip => "strip",
            Function::Year => "year",
            Function::Month => "month",
            Function::Day => "day",
            Function::Date => "date",
            Function::Str => "str",
            Function::Int => "int",
            Function::Float => "float",
        }
    }

    /// Accepted argument counts, inclusive.
    pub fn arity(self) -> (usize, usize) {
        match self {
            Function::Round => (1, 2),
            _ => (1, 1),
        }
    }

    pub(crate) fn date_part(self) -> Option<DatePart> {
        match self {
            Function::Year => Some(DatePart::Year),
            Function::Month => Some(DatePart::Month),
            Function::Day => Some(DatePart::Day),
            _ => None,
        }
    }
}

/// A validated expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Reference to a dataset column by name.
    Column(String),
    /// Constant value.
    Literal(Value),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Arithmetic {
        op: ArithOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Compare {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `expr in [..]` / `expr not in [..]` against a literal set.
    InList {
        expr: Box<Expr>,
        values: Vec<Value>,
        negated: bool,
    },
    Call {
        func: Function,
        args: Vec<Expr>,
    },
}

impl Expr {
    /// Names of all referenced columns, in first-reference order, without duplicates.
    pub fn columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Column(name) => {
                if !out.contains(&name.as_str()) {
                    out.push(name);
                }
            }
            Expr::Literal(_) => {}
            Expr::Unary { expr, .. } | Expr::InList { expr, .. } => expr.collect_columns(out),
            Expr::Arithmetic { left, right, .. }
            | Expr::Compare { left, right, .. }
            | Expr::Logical { left, right, .. } => {
                left.collect_columns(out);
                right.collect_columns(out);
            }
            Expr::Call { args, .. } => {
                for arg in args {
                    arg.collect_columns(out);
                }
            }
        }
    }
}
