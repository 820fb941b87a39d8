use std::collections::HashMap;

use dataops_engine::expression::{evaluate, EvalContext, Evaluated, ExprError, Expression};
use dataops_engine::pipeline::{apply, Step};
use dataops_engine::recipe::{DeriveSpec, Recipe};
use dataops_engine::types::{DataSet, Value};
use dataops_engine::EngineError;

fn sales() -> DataSet {
    DataSet::from_columns(vec![
        ("region", vec![Value::str("APAC"), Value::str("EMEA")]),
        ("revenue", vec![Value::Int64(1200), Value::Null]),
    ])
    .unwrap()
}

#[test]
fn code_execution_shapes_are_rejected_before_evaluation() {
    for src in [
        "__import__('os').system('rm -rf /')",
        "df.revenue",
        "df['revenue'].sum()",
        "open('/etc/passwd')",
        "eval('1 + 1')",
        "(lambda: 1)()",
        "[x for x in revenue]",
        "revenue if region else 0",
        "revenue ** 2",
        "revenue[0]",
        "x := 1",
        "{'a': 1}",
    ] {
        let err = Expression::parse(src).unwrap_err();
        assert!(
            matches!(err, ExprError::DisallowedConstruct { .. } | ExprError::Parse { .. }),
            "{src}: {err:?}"
        );
    }
}

#[test]
fn disallowed_derive_fails_the_derive_step_without_touching_rows() {
    let recipe = Recipe {
        derive: vec![DeriveSpec::new("boom", "__import__('os')")],
        ..Recipe::default()
    };
    let err = apply(&sales(), &recipe, &HashMap::new()).unwrap_err();
    assert_eq!(err.step, Step::Derive);
    assert!(matches!(
        err.source,
        EngineError::Expression {
            source: ExprError::DisallowedConstruct { .. },
            ..
        }
    ));
}

#[test]
fn null_propagates_and_kleene_logic_holds() {
    let ds = sales();
    let eval = |src: &str| match evaluate(&src.parse::<Expression>().unwrap(), EvalContext::Table(&ds))
        .unwrap()
    {
        Evaluated::Column(values) => values,
        Evaluated::Scalar(_) => unreachable!("table context"),
    };

    assert_eq!(eval("revenue * 2"), vec![Value::Int64(2400), Value::Null]);
    assert_eq!(eval("revenue > 0"), vec![Value::Bool(true), Value::Null]);
    assert_eq!(
        eval("revenue > 0 or region == 'EMEA'"),
        vec![Value::Bool(true), Value::Bool(true)]
    );
    assert_eq!(
        eval("revenue > 0 and region == 'APAC'"),
        vec![Value::Bool(true), Value::Null]
    );
}

#[test]
fn filter_keeps_only_true_rows() {
    let recipe = Recipe {
        filter: Some("revenue > 0".to_string()),
        ..Recipe::default()
    };
    let out = apply(&sales(), &recipe, &HashMap::new()).unwrap();
    assert_eq!(out.rows, vec![vec![Value::str("APAC"), Value::Int64(1200)]]);
}

#[test]
fn deeply_nested_input_is_a_parse_error() {
    let parens = format!("{}1{}", "(".repeat(3_000), ")".repeat(3_000));
    let nots = format!("{}True", "not ".repeat(3_000));
    let sums = vec!["revenue"; 10_000].join(" + ");
    for src in [parens, nots, sums] {
        assert!(matches!(
            Expression::parse(&src).unwrap_err(),
            ExprError::Parse { .. }
        ));
    }

    let ds = sales();
    let nested = format!("{}revenue{}", "(".repeat(40), ")".repeat(40));
    let expr = Expression::parse(&nested).unwrap();
    assert_eq!(
        evaluate(&expr, EvalContext::Table(&ds)).unwrap(),
        Evaluated::Column(vec![Value::Int64(1200), Value::Null])
    );
}
