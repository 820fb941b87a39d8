//! Recipe execution.
//!
//! [`apply`] runs the steps of a [`Recipe`] in a fixed order, skipping the ones that are
//! absent:
//!
//! 1. select
//! 2. filter
//! 3. derive (each entry in order, seeing the columns derived before it)
//! 4. join
//! 5. groupby
//!
//! Failure is atomic: the first failing step is reported as a [`PipelineError`] and no partial
//! dataset is returned. The input dataset is never modified.
//!
//! ```rust
//! use std::collections::HashMap;
//!
//! use dataops_engine::pipeline::apply;
//! use dataops_engine::recipe::Recipe;
//! use dataops_engine::types::{DataSet, Value};
//!
//! let sales = DataSet::from_columns(vec![
//!     ("region", vec![Value::str("APAC"), Value::str("EMEA"), Value::str("APAC")]),
//!     ("revenue", vec![Value::Int64(1000), Value::Int64(800), Value::Int64(1200)]),
//! ])
//! .unwrap();
//! let recipe = Recipe::from_json_str(
//!     r#"{"groupby": {"by": ["region"], "agg": {"revenue": "sum"}}}"#,
//! )
//! .unwrap();
//!
//! let out = apply(&sales, &recipe, &HashMap::new()).unwrap();
//! assert_eq!(out.rows[0], vec![Value::str("APAC"), Value::Int64(2200)]);
//! ```

mod observer;

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::error::{EngineError, EngineResult, PipelineError, PipelineResult};
use crate::expression::Expression;
use crate::processing::{self, AggFunc, Aggregation};
use crate::recipe::{GroupBySpec, Recipe};
use crate::types::DataSet;

pub use observer::{
    PipelineEvent, PipelineObserver, StdErrPipelineObserver, TracingPipelineObserver,
};

/// A recipe step, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    Select,
    Filter,
    Derive,
    Join,
    GroupBy,
}

impl Step {
    pub fn name(self) -> &'static str {
        match self {
            Step::Select => "select",
            Step::Filter => "filter",
            Step::Derive => "derive",
            Step::Join => "join",
            Step::GroupBy => "groupby",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Applies recipes, optionally reporting progress to a [`PipelineObserver`].
#[derive(Default, Clone)]
pub struct Pipeline {
    observer: Option<Arc<dyn PipelineObserver>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an observer for pipeline events.
    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Apply `recipe` to `dataset`. `right` maps join dataset names to datasets.
    pub fn apply(
        &self,
        dataset: &DataSet,
        recipe: &Recipe,
        right: &HashMap<String, DataSet>,
    ) -> PipelineResult<DataSet> {
        self.emit(PipelineEvent::RunStarted {
            rows: dataset.row_count(),
            columns: dataset.column_count(),
        });

        let mut current = Cow::Borrowed(dataset);

        if let Some(columns) = &recipe.select {
            current = self.run_step(Step::Select, &current, |ds| processing::select(ds, columns))?;
        }

        if let Some(predicate) = &recipe.filter {
            current = self.run_step(Step::Filter, &current, |ds| {
                processing::filter(ds, &parse_expression(predicate)?)
            })?;
        }

        if !recipe.derive.is_empty() {
            current = self.run_step(Step::Derive, &current, |ds| {
                let mut out = Cow::Borrowed(ds);
                for spec in &recipe.derive {
                    let expr = parse_expression(&spec.expr)?;
                    out = Cow::Owned(processing::derive(&out, &spec.name, &expr)?);
                }
                Ok(out.into_owned())
            })?;
        }

        if let Some(spec) = &recipe.join {
            current = self.run_step(Step::Join, &current, |ds| {
                let other = right.get(&spec.right).ok_or_else(|| EngineError::UnknownDataset {
                    name: spec.right.clone(),
                })?;
                processing::join(ds, other, &spec.on, spec.how)
            })?;
        }

        if let Some(spec) = &recipe.groupby {
            current = self.run_step(Step::GroupBy, &current, |ds| {
                processing::groupby(ds, &spec.by, &aggregations(spec)?)
            })?;
        }

        let out = current.into_owned();
        self.emit(PipelineEvent::RunFinished {
            rows: out.row_count(),
            columns: out.column_count(),
        });
        Ok(out)
    }

    fn run_step<'a, F>(
        &self,
        step: Step,
        input: &DataSet,
        f: F,
    ) -> PipelineResult<Cow<'a, DataSet>>
    where
        F: FnOnce(&DataSet) -> EngineResult<DataSet>,
    {
        self.emit(PipelineEvent::StepStarted { step });
        match f(input) {
            Ok(out) => {
                self.emit(PipelineEvent::StepFinished {
                    step,
                    rows: out.row_count(),
                    columns: out.column_count(),
                });
                Ok(Cow::Owned(out))
            }
            Err(source) => {
                self.emit(PipelineEvent::StepFailed {
                    step,
                    error: source.to_string(),
                });
                Err(PipelineError { step, source })
            }
        }
    }

    fn emit(&self, event: PipelineEvent) {
        if let Some(o) = &self.observer {
            o.on_event(&event);
        }
    }
}

/// Apply `recipe` to `dataset` without an observer. See [`Pipeline::apply`].
pub fn apply(
    dataset: &DataSet,
    recipe: &Recipe,
    right: &HashMap<String, DataSet>,
) -> PipelineResult<DataSet> {
    Pipeline::new().apply(dataset, recipe, right)
}

fn parse_expression(source: &str) -> EngineResult<Expression> {
    Expression::parse(source).map_err(|e| EngineError::Expression {
        expr: source.to_string(),
        source: e,
    })
}

fn aggregations(spec: &GroupBySpec) -> EngineResult<Vec<Aggregation>> {
    spec.agg
        .iter()
        .map(|(column, name)| {
            let func = AggFunc::from_name(name).ok_or_else(|| EngineError::UnknownAggregation {
                function: name.clone(),
                column: column.clone(),
            })?;
            Ok(Aggregation::new(column.clone(), func))
        })
        .collect()
}
