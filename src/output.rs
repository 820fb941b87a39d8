//! Writing datasets back to disk.
//!
//! The format comes from the file extension:
//!
//! - `.csv`: a header row, then one record per row. Nulls are empty cells, dates are ISO.
//! - `.json`: a pretty-printed array of objects, keys in schema order.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use indexmap::IndexMap;

use crate::error::OutputError;
use crate::types::{DataSet, Value};

/// Output formats understood by [`write_to_path`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Json,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Write `dataset` to `path`, creating parent directories as needed.
pub fn write_to_path(dataset: &DataSet, path: impl AsRef<Path>) -> Result<(), OutputError> {
    let path = path.as_ref();
    let format = OutputFormat::from_path(path).ok_or_else(|| OutputError::UnsupportedFormat {
        path: path.to_path_buf(),
    })?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let file = File::create(path)?;
    match format {
        OutputFormat::Csv => write_csv(dataset, file),
        OutputFormat::Json => write_json(dataset, file),
    }
}

/// Write `dataset` as CSV to any writer.
pub fn write_csv<W: Write>(dataset: &DataSet, writer: W) -> Result<(), OutputError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(dataset.schema.field_names())?;
    for row in &dataset.rows {
        wtr.write_record(row.iter().map(cell_text))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write `dataset` as a JSON array of objects to any writer.
pub fn write_json<W: Write>(dataset: &DataSet, writer: W) -> Result<(), OutputError> {
    let records: Vec<IndexMap<&str, &Value>> = dataset
        .rows
        .iter()
        .map(|row| dataset.schema.field_names().zip(row.iter()).collect())
        .collect();
    let mut out = BufWriter::new(writer);
    serde_json::to_writer_pretty(&mut out, &records)?;
    out.flush()?;
    Ok(())
}

fn cell_text(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
