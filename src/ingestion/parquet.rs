//! Parquet ingestion through the record API.

use std::collections::HashMap;
use std::path::Path;

use parquet::basic::{ConvertedType, Type as PhysicalType};
use parquet::file::reader::{ChunkReader, FileReader};
use parquet::file::serialized_reader::SerializedFileReader;
use parquet::record::Field as ParquetField;
use parquet::schema::types::ColumnDescriptor;

use super::cell;
use crate::error::{IngestionError, IngestionResult};
use crate::types::{date_from_epoch_days, DataSet, DataType, Field, Schema, Value};

/// Ingest a Parquet file into an in-memory `DataSet`.
///
/// Every schema field must exist as a Parquet leaf column (matched by its dotted column path).
/// `Date` fields accept Parquet `DATE` values and ISO strings.
pub fn ingest_parquet_from_path(path: impl AsRef<Path>, schema: &Schema) -> IngestionResult<DataSet> {
    let reader = SerializedFileReader::try_from(path.as_ref())?;

    let available = leaf_columns(&reader);
    if let Some(field) = schema
        .fields
        .iter()
        .find(|f| !available.iter().any(|c| c.path().string() == f.name))
    {
        return Err(IngestionError::SchemaMismatch {
            message: format!("missing required column '{}'", field.name),
        });
    }

    let mut rows: Vec<Vec<Value>> = Vec::new();
    for (idx0, row_res) in reader.into_iter().enumerate() {
        let row_num = idx0 + 1;
        let row = row_res?;
        let by_name: HashMap<&str, &ParquetField> = row
            .get_column_iter()
            .map(|(name, field)| (name.as_str(), field))
            .collect();

        let mut out_row: Vec<Value> = Vec::with_capacity(schema.fields.len());
        for f in &schema.fields {
            let v = by_name
                .get(f.name.as_str())
                .ok_or_else(|| IngestionError::SchemaMismatch {
                    message: format!("row {row_num} missing required column '{}'", f.name),
                })?;
            out_row.push(convert_parquet_field(row_num, &f.name, f.data_type, v)?);
        }
        rows.push(out_row);
    }

    Ok(DataSet::new(schema.clone(), rows))
}

/// Derive a [`Schema`] from a Parquet file's leaf columns.
///
/// `BOOLEAN` → `Bool`, `INT32 (DATE)` → `Date`, other `INT32`/`INT64` → `Int64`,
/// `FLOAT`/`DOUBLE` → `Float64`, `BYTE_ARRAY (UTF8)` → `Utf8`. Anything else is a
/// [`IngestionError::SchemaMismatch`].
pub fn parquet_schema(path: impl AsRef<Path>) -> IngestionResult<Schema> {
    let reader = SerializedFileReader::try_from(path.as_ref())?;
    leaf_columns(&reader)
        .iter()
        .map(|c| Ok(Field::new(c.path().string(), data_type_for(c)?)))
        .collect::<IngestionResult<Vec<_>>>()
        .map(Schema::new)
}

/// Ingest a Parquet file using the schema from [`parquet_schema`].
pub fn ingest_parquet_inferred_from_path(path: impl AsRef<Path>) -> IngestionResult<DataSet> {
    let schema = parquet_schema(path.as_ref())?;
    ingest_parquet_from_path(path, &schema)
}

fn leaf_columns<R: ChunkReader + 'static>(
    reader: &SerializedFileReader<R>,
) -> Vec<std::sync::Arc<ColumnDescriptor>> {
    reader
        .metadata()
        .file_metadata()
        .schema_descr()
        .columns()
        .to_vec()
}

fn data_type_for(c: &ColumnDescriptor) -> IngestionResult<DataType> {
    let converted = c.converted_type();
    match c.physical_type() {
        PhysicalType::BOOLEAN => Ok(DataType::Bool),
        PhysicalType::INT32 if converted == ConvertedType::DATE => Ok(DataType::Date),
        PhysicalType::INT32 | PhysicalType::INT64 => Ok(DataType::Int64),
        PhysicalType::FLOAT | PhysicalType::DOUBLE => Ok(DataType::Float64),
        PhysicalType::BYTE_ARRAY if converted == ConvertedType::UTF8 => Ok(DataType::Utf8),
        other => Err(IngestionError::SchemaMismatch {
            message: format!(
                "unsupported parquet column '{}' ({other:?}, {converted:?})",
                c.path().string()
            ),
        }),
    }
}

fn convert_parquet_field(
    row: usize,
    column: &str,
    data_type: DataType,
    f: &ParquetField,
) -> IngestionResult<Value> {
    if matches!(f, ParquetField::Null) {
        return Ok(Value::Null);
    }
    let fail = |message: String| IngestionError::ParseError {
        row,
        column: column.to_string(),
        raw: f.to_string(),
        message,
    };

    match (data_type, f) {
        (DataType::Utf8, ParquetField::Str(s)) => Ok(Value::Utf8(s.clone())),
        (DataType::Utf8, _) => Err(fail("expected string".to_string())),
        (DataType::Bool, ParquetField::Bool(b)) => Ok(Value::Bool(*b)),
        (DataType::Bool, _) => Err(fail("expected bool".to_string())),
        (DataType::Int64, ParquetField::Byte(v)) => Ok(Value::Int64(i64::from(*v))),
        (DataType::Int64, ParquetField::Short(v)) => Ok(Value::Int64(i64::from(*v))),
        (DataType::Int64, ParquetField::Int(v)) => Ok(Value::Int64(i64::from(*v))),
        (DataType::Int64, ParquetField::Long(v)) => Ok(Value::Int64(*v)),
        (DataType::Int64, ParquetField::UByte(v)) => Ok(Value::Int64(i64::from(*v))),
        (DataType::Int64, ParquetField::UShort(v)) => Ok(Value::Int64(i64::from(*v))),
        (DataType::Int64, ParquetField::UInt(v)) => Ok(Value::Int64(i64::from(*v))),
        (DataType::Int64, ParquetField::ULong(v)) => i64::try_from(*v)
            .map(Value::Int64)
            .map_err(|_| fail("u64 out of range for i64".to_string())),
        (DataType::Int64, _) => Err(fail("expected integer".to_string())),
        (DataType::Float64, ParquetField::Float(v)) => Ok(Value::Float64(f64::from(*v))),
        (DataType::Float64, ParquetField::Double(v)) => Ok(Value::Float64(*v)),
        (DataType::Float64, _) => Err(fail("expected number".to_string())),
        (DataType::Date, ParquetField::Date(days)) => date_from_epoch_days(*days)
            .map(Value::Date)
            .ok_or_else(|| fail("date out of range".to_string())),
        (DataType::Date, ParquetField::Str(s)) => {
            cell::parse_text(DataType::Date, s.trim()).map_err(fail)
        }
        (DataType::Date, _) => Err(fail("expected date".to_string())),
        (DataType::Null, _) => Err(fail("expected null".to_string())),
    }
}
