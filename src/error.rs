//! Error types shared across the crate.
//!
//! - [`EngineError`]: a recipe step or dataset operation failed.
//! - [`PipelineError`]: an [`EngineError`] plus the pipeline [`Step`] that raised it.
//! - [`IngestionError`]: reading a dataset file failed.
//! - [`ConfigError`]: decoding a recipe or rule set failed.
//! - [`OutputError`]: writing a dataset or report failed.
//! - [`RunError`]: an orchestrated run failed.
//!
//! Expression-level failures are [`crate::expression::ExprError`]. Data-quality violations are
//! never errors; they are reported in a [`crate::quality::DqReport`].

use std::path::PathBuf;

use thiserror::Error;

use crate::expression::ExprError;
use crate::pipeline::Step;

/// Convenience result type for step-level operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Convenience result type for [`crate::pipeline::apply`].
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Convenience result type for ingestion operations.
pub type IngestionResult<T> = Result<T, IngestionError>;

/// Error raised by a single recipe step or dataset operation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// A filter or derive expression failed to parse, was rejected, or failed to evaluate.
    #[error("expression `{expr}`: {source}")]
    Expression {
        expr: String,
        #[source]
        source: ExprError,
    },

    /// A referenced column does not exist.
    #[error("unknown column '{column}'")]
    UnknownColumn { column: String },

    /// An operation would produce two columns with the same name.
    #[error("duplicate column '{column}'")]
    DuplicateColumn { column: String },

    /// A column holds values of a type the operation cannot handle.
    #[error("type mismatch in column '{column}': {message}")]
    TypeMismatch { column: String, message: String },

    /// Join keys are missing on one side or have incomparable types.
    #[error("join key mismatch on '{column}': {message}")]
    JoinKeyMismatch { column: String, message: String },

    /// A groupby aggregation names an unsupported function.
    #[error("unknown aggregation '{function}' for column '{column}'")]
    UnknownAggregation { function: String, column: String },

    /// A join references a right-hand dataset that was not supplied.
    #[error("right dataset '{name}' was not provided")]
    UnknownDataset { name: String },

    /// Integer arithmetic overflowed while aggregating.
    #[error("integer overflow while aggregating column '{column}'")]
    Overflow { column: String },

    /// Rows do not match the schema.
    #[error("invalid dataset: {message}")]
    InvalidDataSet { message: String },
}

/// Error returned by the recipe pipeline: the first failing step and its reason.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{step} step failed: {source}")]
pub struct PipelineError {
    /// Step that failed.
    pub step: Step,
    /// Why it failed.
    #[source]
    pub source: EngineError,
}

/// Error type returned by ingestion functions.
///
/// This is a single error enum shared across CSV/JSON/Parquet ingestion.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reader error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Parquet reader error.
    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Malformed JSON input.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The input does not conform to the provided schema (missing required fields/columns, etc.).
    #[error("schema mismatch: {message}")]
    SchemaMismatch { message: String },

    /// A value could not be parsed into the required [`crate::types::DataType`].
    #[error("failed to parse value at row {row} column '{column}': {message} (raw='{raw}')")]
    ParseError {
        row: usize,
        column: String,
        raw: String,
        message: String,
    },
}

/// Error decoding a recipe or rule set.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid json config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid yaml config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The file extension is not one of `json`, `yaml`, `yml`.
    #[error("unsupported config format for path ({})", path.display())]
    UnsupportedFormat { path: PathBuf },
}

/// Error writing a dataset or report to disk.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The file extension is not one of `csv`, `json`.
    #[error("unsupported output format for path ({})", path.display())]
    UnsupportedFormat { path: PathBuf },
}

/// Error returned by [`crate::run::run`].
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Ingestion(#[from] IngestionError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Writing the output dataset or the report failed.
    #[error("output error: {0}")]
    Output(#[from] OutputError),

    /// A path resolves outside the configured workspace root.
    #[error("path is outside the workspace root: {}", path.display())]
    OutsideWorkspace { path: PathBuf },

    /// The report title would not name a single file inside the report directory.
    #[error("report title '{title}' is not a plain file name")]
    InvalidReportTitle { title: String },
}
