//! Row filtering for [`crate::types::DataSet`].

use crate::error::EngineResult;
use crate::expression::{ExprError, Expression};
use crate::types::{DataSet, Value};

use super::expression_error;

/// Returns a new [`DataSet`] containing only rows for which `predicate` evaluates to `true`.
///
/// `false` and null both drop the row. Any other result type is a
/// [`ExprError::TypeMismatch`]. Surviving rows keep their relative order.
pub fn filter(dataset: &DataSet, predicate: &Expression) -> EngineResult<DataSet> {
    let bound = predicate
        .bind(&dataset.schema)
        .map_err(|e| expression_error(predicate, e))?;

    dataset.try_filter_rows(|row| match bound.eval_row(row) {
        Ok(Value::Bool(keep)) => Ok(keep),
        Ok(Value::Null) => Ok(false),
        Ok(other) => Err(expression_error(
            predicate,
            ExprError::TypeMismatch {
                message: format!("filter must evaluate to bool, got {}", other.data_type()),
            },
        )),
        Err(e) => Err(expression_error(predicate, e)),
    })
}

#[cfg(test)]
mod tests {
    use super::filter;
    use crate::error::EngineError;
    use crate::expression::{ExprError, Expression};
    use crate::types::{DataSet, DataType, Field, Schema, Value};

    fn sample_dataset() -> DataSet {
        let schema = Schema::new(vec![
            Field::new("id", DataType::Int64),
            Field::new("active", DataType::Bool),
            Field::new("name", DataType::Utf8),
        ]);

        let rows = vec![
            vec![Value::Int64(1), Value::Bool(true), Value::Utf8("a".to_string())],
            vec![Value::Int64(2), Value::Bool(false), Value::Utf8("b".to_string())],
            vec![Value::Int64(3), Value::Null, Value::Utf8("c".to_string())],
        ];

        DataSet::new(schema, rows)
    }

    fn expr(src: &str) -> Expression {
        Expression::parse(src).unwrap()
    }

    #[test]
    fn filter_rows_by_numeric_predicate() {
        let ds = sample_dataset();
        let out = filter(&ds, &expr("id > 1")).unwrap();

        assert_eq!(out.schema, ds.schema);
        assert_eq!(out.rows, ds.rows[1..].to_vec());
        // Original unchanged
        assert_eq!(ds.row_count(), 3);
    }

    #[test]
    fn null_results_drop_the_row() {
        let ds = sample_dataset();
        let out = filter(&ds, &expr("active")).unwrap();
        assert_eq!(out.rows, vec![ds.rows[0].clone()]);

        let out = filter(&ds, &expr("active or id == 3")).unwrap();
        assert_eq!(out.row_count(), 2);
    }

    #[test]
    fn non_boolean_predicate_is_a_type_mismatch() {
        let ds = sample_dataset();
        let err = filter(&ds, &expr("id + 1")).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Expression {
                source: ExprError::TypeMismatch { .. },
                ..
            }
        ));
    }

    #[test]
    fn filter_can_return_empty_dataset() {
        let ds = sample_dataset();
        let out = filter(&ds, &expr("name == 'zzz'")).unwrap();
        assert_eq!(out.schema, ds.schema);
        assert!(out.rows.is_empty());
    }
}
