use crate::pipeline::Step;

/// Events emitted while a recipe is applied.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    RunStarted { rows: usize, columns: usize },
    StepStarted { step: Step },
    StepFinished { step: Step, rows: usize, columns: usize },
    StepFailed { step: Step, error: String },
    RunFinished { rows: usize, columns: usize },
}

/// Observer hook for pipeline events.
pub trait PipelineObserver: Send + Sync {
    fn on_event(&self, event: &PipelineEvent);
}

/// A simple stderr logger for pipeline events.
#[derive(Default)]
pub struct StdErrPipelineObserver;

impl PipelineObserver for StdErrPipelineObserver {
    fn on_event(&self, event: &PipelineEvent) {
        eprintln!("{event:?}");
    }
}

/// Forwards pipeline events to `tracing`: progress at `debug`, failures at `warn`.
#[derive(Default)]
pub struct TracingPipelineObserver;

impl PipelineObserver for TracingPipelineObserver {
    fn on_event(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::RunStarted { rows, columns } => {
                tracing::debug!(rows, columns, "pipeline started");
            }
            PipelineEvent::StepStarted { step } => {
                tracing::debug!(step = %step, "step started");
            }
            PipelineEvent::StepFinished {
                step,
                rows,
                columns,
            } => {
                tracing::debug!(step = %step, rows, columns, "step finished");
            }
            PipelineEvent::StepFailed { step, error } => {
                tracing::warn!(step = %step, error = %error, "step failed");
            }
            PipelineEvent::RunFinished { rows, columns } => {
                tracing::debug!(rows, columns, "pipeline finished");
            }
        }
    }
}
