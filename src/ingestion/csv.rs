//! CSV ingestion.
//!
//! Files must have a header row. Cells are trimmed; empty cells become [`Value::Null`].

use std::io::Read;
use std::path::Path;

use csv::StringRecord;

use super::cell::{self, TypeCandidates};
use crate::error::{IngestionError, IngestionResult};
use crate::types::{DataSet, Field, Schema, Value};

/// Ingest a CSV file into an in-memory [`DataSet`].
///
/// Rules:
///
/// - CSV must have headers.
/// - Headers must contain all schema fields (order can differ; extra columns are ignored).
/// - Each value is parsed according to the schema field type.
pub fn ingest_csv_from_path(path: impl AsRef<Path>, schema: &Schema) -> IngestionResult<DataSet> {
    let mut rdr = reader(path)?;
    ingest_csv_from_reader(&mut rdr, schema)
}

/// Ingest CSV data from an existing CSV reader.
pub fn ingest_csv_from_reader<R: Read>(
    rdr: &mut csv::Reader<R>,
    schema: &Schema,
) -> IngestionResult<DataSet> {
    let headers = rdr.headers()?.clone();
    let col_idxs = locate_columns(&headers, schema)?;

    let mut rows = Vec::new();
    for (idx0, result) in rdr.records().enumerate() {
        rows.push(parse_record(idx0, &result?, schema, &col_idxs)?);
    }
    Ok(DataSet::new(schema.clone(), rows))
}

/// Infer a schema from a CSV file's header and cells.
///
/// Each column gets the narrowest of `Int64`, `Float64`, `Bool`, `Date` and `Utf8` that every
/// non-empty cell parses as. Columns with no non-empty cells are `Utf8`.
pub fn infer_csv_schema(path: impl AsRef<Path>) -> IngestionResult<Schema> {
    let mut rdr = reader(path)?;
    let headers = rdr.headers()?.clone();
    let records = rdr.records().collect::<Result<Vec<_>, _>>()?;
    infer_schema(&headers, &records)
}

/// Ingest a CSV file without a schema, inferring one with the rules of [`infer_csv_schema`].
///
/// The file is read once.
pub fn ingest_csv_inferred_from_path(path: impl AsRef<Path>) -> IngestionResult<DataSet> {
    let mut rdr = reader(path)?;
    ingest_csv_inferred_from_reader(&mut rdr)
}

/// Like [`ingest_csv_inferred_from_path`], for an existing CSV reader.
pub fn ingest_csv_inferred_from_reader<R: Read>(
    rdr: &mut csv::Reader<R>,
) -> IngestionResult<DataSet> {
    let headers = rdr.headers()?.clone();
    let records = rdr.records().collect::<Result<Vec<_>, _>>()?;
    let schema = infer_schema(&headers, &records)?;
    let col_idxs: Vec<usize> = (0..schema.fields.len()).collect();

    let rows = records
        .iter()
        .enumerate()
        .map(|(idx0, record)| parse_record(idx0, record, &schema, &col_idxs))
        .collect::<IngestionResult<Vec<_>>>()?;
    Ok(DataSet::new(schema, rows))
}

fn reader(path: impl AsRef<Path>) -> IngestionResult<csv::Reader<std::fs::File>> {
    Ok(csv::ReaderBuilder::new().has_headers(true).from_path(path)?)
}

fn infer_schema(headers: &StringRecord, records: &[StringRecord]) -> IngestionResult<Schema> {
    let mut candidates = vec![TypeCandidates::default(); headers.len()];
    for record in records {
        for (c, raw) in candidates.iter_mut().zip(record.iter()) {
            c.observe(raw);
        }
    }

    let mut fields: Vec<Field> = Vec::with_capacity(headers.len());
    for (name, c) in headers.iter().zip(candidates) {
        let name = name.trim();
        if fields.iter().any(|f| f.name == name) {
            return Err(IngestionError::SchemaMismatch {
                message: format!("duplicate column '{name}' in header"),
            });
        }
        fields.push(Field::new(name, c.resolve()));
    }
    Ok(Schema::new(fields))
}

/// Map schema fields to CSV column indexes (allows re-ordered CSV columns).
fn locate_columns(headers: &StringRecord, schema: &Schema) -> IngestionResult<Vec<usize>> {
    schema
        .fields
        .iter()
        .map(|field| {
            headers
                .iter()
                .position(|h| h.trim() == field.name)
                .ok_or_else(|| IngestionError::SchemaMismatch {
                    message: format!(
                        "missing required column '{}'. headers={:?}",
                        field.name,
                        headers.iter().collect::<Vec<_>>()
                    ),
                })
        })
        .collect()
}

fn parse_record(
    idx0: usize,
    record: &StringRecord,
    schema: &Schema,
    col_idxs: &[usize],
) -> IngestionResult<Vec<Value>> {
    // 1-based for users, and the header is row 1.
    let user_row = idx0 + 2;
    schema
        .fields
        .iter()
        .zip(col_idxs)
        .map(|(field, &csv_idx)| {
            let raw = record.get(csv_idx).unwrap_or("");
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Ok(Value::Null);
            }
            cell::parse_text(field.data_type, trimmed).map_err(|message| {
                IngestionError::ParseError {
                    row: user_row,
                    column: field.name.clone(),
                    raw: raw.to_owned(),
                    message,
                }
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DataType;

    fn csv_reader(text: &str) -> csv::Reader<&[u8]> {
        csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(text.as_bytes())
    }

    #[test]
    fn inferred_ingest_types_each_column() {
        let mut rdr = csv_reader(
            "order_id,date,region,revenue,paid\n1,2024-01-05,APAC,1000,true\n2,2024-01-06,,80.5,\n",
        );
        let ds = ingest_csv_inferred_from_reader(&mut rdr).unwrap();
        let types: Vec<DataType> = ds.schema.fields.iter().map(|f| f.data_type).collect();
        assert_eq!(
            types,
            vec![
                DataType::Int64,
                DataType::Date,
                DataType::Utf8,
                DataType::Float64,
                DataType::Bool
            ]
        );
        assert_eq!(ds.rows[1][2], Value::Null);
        assert_eq!(ds.rows[1][3], Value::Float64(80.5));
    }

    #[test]
    fn parse_errors_report_user_row_numbers() {
        let schema = Schema::new(vec![Field::new("n", DataType::Int64)]);
        let mut rdr = csv_reader("n\n1\nx\n");
        let err = ingest_csv_from_reader(&mut rdr, &schema).unwrap_err();
        match err {
            IngestionError::ParseError { row, column, .. } => {
                assert_eq!(row, 3);
                assert_eq!(column, "n");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
