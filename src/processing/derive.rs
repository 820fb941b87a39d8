//! Derived columns computed from expressions.

use crate::error::{EngineError, EngineResult};
use crate::expression::Expression;
use crate::types::{unify_column, DataSet, Field};

use super::expression_error;

/// Returns a new [`DataSet`] with `expr` evaluated into column `name`.
///
/// The expression is evaluated column-at-a-time against `dataset`. An existing column with the
/// same name is overwritten in place; otherwise the column is appended. The column type is the
/// common type of the non-null results (`int64` mixed with `float64` becomes `float64`; no
/// non-null result gives `null`).
pub fn derive(dataset: &DataSet, name: &str, expr: &Expression) -> EngineResult<DataSet> {
    let values = expr
        .bind(&dataset.schema)
        .and_then(|bound| bound.eval_column(dataset))
        .map_err(|e| expression_error(expr, e))?;

    let (data_type, values) = unify_column(values).map_err(|(a, b)| EngineError::TypeMismatch {
        column: name.to_string(),
        message: format!("expression `{expr}` produced both {a} and {b} values"),
    })?;
    dataset.with_column(Field::new(name, data_type), values)
}

#[cfg(test)]
mod tests {
    use super::derive;
    use crate::error::EngineError;
    use crate::expression::{ExprError, Expression};
    use crate::types::{DataSet, DataType, Value};

    fn sample_dataset() -> DataSet {
        DataSet::from_columns(vec![
            ("id", vec![Value::Int64(1), Value::Int64(2), Value::Int64(3)]),
            ("revenue", vec![Value::Int64(1500), Value::Null, Value::Int64(250)]),
            ("name", vec![Value::str("a"), Value::str("b"), Value::str("c")]),
        ])
        .unwrap()
    }

    fn expr(src: &str) -> Expression {
        Expression::parse(src).unwrap()
    }

    #[test]
    fn derive_appends_new_column() {
        let ds = sample_dataset();
        let out = derive(&ds, "rev_k", &expr("revenue / 1000")).unwrap();

        assert_eq!(
            out.schema.field_names().collect::<Vec<_>>(),
            ["id", "revenue", "name", "rev_k"]
        );
        assert_eq!(out.schema.fields[3].data_type, DataType::Float64);
        assert_eq!(
            out.column("rev_k").unwrap(),
            vec![Value::Float64(1.5), Value::Null, Value::Float64(0.25)]
        );
        // Original unchanged
        assert_eq!(ds.column_count(), 3);
    }

    #[test]
    fn derive_overwrites_in_place() {
        let ds = sample_dataset();
        let out = derive(&ds, "name", &expr("upper(name)")).unwrap();
        assert_eq!(out.schema.field_names().collect::<Vec<_>>(), ["id", "revenue", "name"]);
        assert_eq!(out.rows[0][2], Value::str("A"));
    }

    #[test]
    fn all_null_result_has_null_type() {
        let ds = sample_dataset();
        let out = derive(&ds, "nothing", &expr("None")).unwrap();
        assert_eq!(out.schema.fields[3].data_type, DataType::Null);
        assert!(out.column("nothing").unwrap().iter().all(Value::is_null));
    }

    #[test]
    fn unknown_column_is_reported_with_the_expression() {
        let ds = sample_dataset();
        let err = derive(&ds, "x", &expr("price * 2")).unwrap_err();
        assert_eq!(
            err,
            EngineError::Expression {
                expr: "price * 2".to_string(),
                source: ExprError::UnknownColumn {
                    name: "price".to_string()
                },
            }
        );
    }
}
