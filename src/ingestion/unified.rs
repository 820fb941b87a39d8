//! Unified ingestion entry points.
//!
//! [`ingest_from_path`] reads a file with a caller-supplied [`Schema`]; [`ingest_inferred`]
//! derives the schema from the file itself. Both pick the format from the file extension unless
//! [`IngestionOptions::format`] forces one, and both report the outcome to the configured
//! [`IngestionObserver`].

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::error::{IngestionError, IngestionResult};
use crate::types::{DataSet, Schema};

use super::observability::{IngestionContext, IngestionObserver, IngestionSeverity, IngestionStats};
use super::{csv, json, parquet};

/// Supported ingestion formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IngestionFormat {
    /// Comma-separated values with a header row.
    Csv,
    /// JSON array of objects, single object, or NDJSON.
    Json,
    /// Apache Parquet.
    Parquet,
}

impl IngestionFormat {
    /// Parse a format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "json" | "ndjson" => Some(Self::Json),
            "parquet" | "pq" => Some(Self::Parquet),
            _ => None,
        }
    }

    /// Format implied by the extension of `path`, if any.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|s| s.to_str())
            .and_then(Self::from_extension)
    }
}

impl fmt::Display for IngestionFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Parquet => "parquet",
        })
    }
}

/// Options controlling unified ingestion.
#[derive(Clone)]
pub struct IngestionOptions {
    /// If `None`, the format comes from the file extension.
    pub format: Option<IngestionFormat>,
    /// Receives success/failure/alert callbacks.
    pub observer: Option<Arc<dyn IngestionObserver>>,
    /// Failures at or above this severity also trigger `on_alert`.
    pub alert_at_or_above: IngestionSeverity,
}

impl fmt::Debug for IngestionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestionOptions")
            .field("format", &self.format)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            format: None,
            observer: None,
            alert_at_or_above: IngestionSeverity::Critical,
        }
    }
}

/// Ingest `path` into a [`DataSet`] shaped by `schema`.
///
/// ```no_run
/// use dataops_engine::ingestion::{ingest_from_path, IngestionOptions};
/// use dataops_engine::types::{DataType, Field, Schema};
///
/// # fn main() -> Result<(), dataops_engine::IngestionError> {
/// let schema = Schema::new(vec![
///     Field::new("order_id", DataType::Int64),
///     Field::new("region", DataType::Utf8),
/// ]);
/// let ds = ingest_from_path("sales.csv", &schema, &IngestionOptions::default())?;
/// println!("rows={}", ds.row_count());
/// # Ok(())
/// # }
/// ```
pub fn ingest_from_path(
    path: impl AsRef<Path>,
    schema: &Schema,
    options: &IngestionOptions,
) -> IngestionResult<DataSet> {
    let path = path.as_ref();
    let format = resolve_format(path, options)?;
    let result = match format {
        IngestionFormat::Csv => csv::ingest_csv_from_path(path, schema),
        IngestionFormat::Json => json::ingest_json_from_path(path, schema),
        IngestionFormat::Parquet => parquet::ingest_parquet_from_path(path, schema),
    };
    report(path, format, false, options, result)
}

/// Ingest `path` without a schema, inferring column types from the file.
///
/// CSV follows [`csv::infer_csv_schema`], JSON follows [`json::ingest_json_inferred_from_str`],
/// and Parquet uses the file's own schema ([`parquet::parquet_schema`]).
///
/// ```no_run
/// use dataops_engine::ingestion::{ingest_inferred, IngestionFormat, IngestionOptions};
///
/// # fn main() -> Result<(), dataops_engine::IngestionError> {
/// let opts = IngestionOptions {
///     format: Some(IngestionFormat::Json),
///     ..Default::default()
/// };
/// let ds = ingest_inferred("events_without_extension", &opts)?;
/// println!("columns={}", ds.column_count());
/// # Ok(())
/// # }
/// ```
pub fn ingest_inferred(path: impl AsRef<Path>, options: &IngestionOptions) -> IngestionResult<DataSet> {
    let path = path.as_ref();
    let format = resolve_format(path, options)?;
    let result = match format {
        IngestionFormat::Csv => csv::ingest_csv_inferred_from_path(path),
        IngestionFormat::Json => json::ingest_json_inferred_from_path(path),
        IngestionFormat::Parquet => parquet::ingest_parquet_inferred_from_path(path),
    };
    report(path, format, true, options, result)
}

fn report(
    path: &Path,
    format: IngestionFormat,
    inferred_schema: bool,
    options: &IngestionOptions,
    result: IngestionResult<DataSet>,
) -> IngestionResult<DataSet> {
    let Some(obs) = options.observer.as_ref() else {
        return result;
    };
    let ctx = IngestionContext {
        path: path.to_path_buf(),
        format,
        inferred_schema,
    };
    match &result {
        Ok(ds) => obs.on_success(
            &ctx,
            IngestionStats {
                rows: ds.row_count(),
                columns: ds.column_count(),
            },
        ),
        Err(e) => {
            let severity = IngestionSeverity::of(e);
            obs.on_failure(&ctx, severity, e);
            if severity >= options.alert_at_or_above {
                obs.on_alert(&ctx, severity, e);
            }
        }
    }
    result
}

fn resolve_format(path: &Path, options: &IngestionOptions) -> IngestionResult<IngestionFormat> {
    if let Some(f) = options.format {
        return Ok(f);
    }
    IngestionFormat::from_path(path).ok_or_else(|| IngestionError::SchemaMismatch {
        message: format!("cannot infer format from path ({})", path.display()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_map_to_formats() {
        assert_eq!(IngestionFormat::from_extension("CSV"), Some(IngestionFormat::Csv));
        assert_eq!(IngestionFormat::from_extension("ndjson"), Some(IngestionFormat::Json));
        assert_eq!(IngestionFormat::from_extension("pq"), Some(IngestionFormat::Parquet));
        assert_eq!(IngestionFormat::from_extension("xlsx"), None);
        assert_eq!(IngestionFormat::from_path(Path::new("no_extension")), None);
    }

    #[test]
    fn unknown_extension_is_a_schema_mismatch() {
        let err = ingest_inferred("data.txt", &IngestionOptions::default()).unwrap_err();
        assert!(matches!(err, IngestionError::SchemaMismatch { .. }));
    }
}
