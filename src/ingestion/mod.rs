//! Dataset ingestion from CSV, JSON and Parquet files.
//!
//! Most callers use [`ingest_from_path`] (caller-supplied schema) or [`ingest_inferred`]
//! (schema derived from the file). Both:
//!
//! - pick the format from the file extension, or the one forced in [`IngestionOptions`],
//! - read the whole file into an in-memory [`crate::types::DataSet`],
//! - optionally report success/failure/alerts to an [`IngestionObserver`].
//!
//! Format-specific functions live in [`csv`], [`json`] and [`parquet`]; [`list_datasets`] finds
//! dataset files under a directory.

mod cell;
pub mod csv;
mod discover;
pub mod json;
pub mod observability;
pub mod parquet;
pub mod unified;

pub use csv::infer_csv_schema;
pub use discover::{list_datasets, DATASET_EXTENSIONS};
pub use observability::{
    CompositeObserver, FileObserver, IngestionContext, IngestionObserver, IngestionSeverity,
    IngestionStats, StdErrObserver, TracingObserver,
};
pub use unified::{ingest_from_path, ingest_inferred, IngestionFormat, IngestionOptions};
