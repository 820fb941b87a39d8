use thiserror::Error;

/// Convenience result type for expression parsing and evaluation.
pub type ExprResult<T> = Result<T, ExprError>;

/// Errors raised while parsing, validating, binding or evaluating an expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    /// Malformed expression syntax.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// The expression uses a construct outside the allowed grammar.
    #[error("disallowed construct '{construct}'")]
    DisallowedConstruct { construct: String },

    /// A column reference does not resolve against the dataset schema.
    #[error("unknown column '{name}'")]
    UnknownColumn { name: String },

    /// An operator or function was applied to values of the wrong type.
    #[error("type mismatch: {message}")]
    TypeMismatch { message: String },

    /// Integer arithmetic overflowed.
    #[error("integer overflow: {message}")]
    Overflow { message: String },
}

impl ExprError {
    pub(crate) fn parse(message: impl Into<String>) -> Self {
        ExprError::Parse {
            message: message.into(),
        }
    }

    pub(crate) fn disallowed(construct: impl Into<String>) -> Self {
        ExprError::DisallowedConstruct {
            construct: construct.into(),
        }
    }

    pub(crate) fn type_mismatch(message: impl Into<String>) -> Self {
        ExprError::TypeMismatch {
            message: message.into(),
        }
    }
}
