use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::NaiveDate;
use parquet::column::writer::ColumnWriter;
use parquet::data_type::ByteArray;
use parquet::file::properties::WriterProperties;
use parquet::file::writer::SerializedFileWriter;
use parquet::schema::parser::parse_message_type;

use dataops_engine::ingestion::parquet::{
    ingest_parquet_from_path, ingest_parquet_inferred_from_path, parquet_schema,
};
use dataops_engine::types::{DataType, Field, Schema, Value};

fn tmp_file(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("dataops-engine-{name}-{nanos}.parquet"))
}

const ORDERS: &str = r#"
message schema {
  REQUIRED INT64 order_id;
  REQUIRED BINARY region (UTF8);
  OPTIONAL DOUBLE revenue;
  REQUIRED BOOLEAN paid;
  REQUIRED INT32 day (DATE);
}
"#;

/// Two orders; the second has a null revenue.
fn write_orders_parquet(path: &PathBuf) {
    let schema = Arc::new(parse_message_type(ORDERS).unwrap());
    let props = Arc::new(WriterProperties::builder().build());
    let file = File::create(path).unwrap();
    let mut writer = SerializedFileWriter::new(file, schema, props).unwrap();

    let mut rg = writer.next_row_group().unwrap();
    while let Some(mut col) = rg.next_column().unwrap() {
        match col.untyped() {
            ColumnWriter::Int64ColumnWriter(w) => {
                w.write_batch(&[1_i64, 2_i64], None, None).unwrap();
            }
            ColumnWriter::ByteArrayColumnWriter(w) => {
                let regions = [ByteArray::from("APAC"), ByteArray::from("EMEA")];
                w.write_batch(&regions, None, None).unwrap();
            }
            ColumnWriter::DoubleColumnWriter(w) => {
                w.write_batch(&[1000.0_f64], Some(&[1, 0]), None).unwrap();
            }
            ColumnWriter::BoolColumnWriter(w) => {
                w.write_batch(&[true, false], None, None).unwrap();
            }
            ColumnWriter::Int32ColumnWriter(w) => {
                // 2025-01-01 and 2025-01-02 as days since the epoch
                w.write_batch(&[20_089_i32, 20_090_i32], None, None).unwrap();
            }
            _ => panic!("unexpected column writer in test"),
        }
        col.close().unwrap();
    }
    rg.close().unwrap();
    writer.close().unwrap();
}

fn day(d: u32) -> Value {
    Value::Date(NaiveDate::from_ymd_opt(2025, 1, d).unwrap())
}

#[test]
fn parquet_schema_maps_physical_and_logical_types() {
    let path = tmp_file("schema");
    write_orders_parquet(&path);

    let schema = parquet_schema(&path).unwrap();
    assert_eq!(
        schema,
        Schema::new(vec![
            Field::new("order_id", DataType::Int64),
            Field::new("region", DataType::Utf8),
            Field::new("revenue", DataType::Float64),
            Field::new("paid", DataType::Bool),
            Field::new("day", DataType::Date),
        ])
    );
    let _ = std::fs::remove_file(&path);
}

#[test]
fn ingest_parquet_inferred_reads_dates_and_nulls() {
    let path = tmp_file("inferred");
    write_orders_parquet(&path);

    let ds = ingest_parquet_inferred_from_path(&path).unwrap();
    assert_eq!(
        ds.rows,
        vec![
            vec![
                Value::Int64(1),
                Value::str("APAC"),
                Value::Float64(1000.0),
                Value::Bool(true),
                day(1)
            ],
            vec![
                Value::Int64(2),
                Value::str("EMEA"),
                Value::Null,
                Value::Bool(false),
                day(2)
            ],
        ]
    );
    let _ = std::fs::remove_file(&path);
}

#[test]
fn ingest_parquet_projects_requested_columns() {
    let path = tmp_file("projection");
    write_orders_parquet(&path);

    let schema = Schema::new(vec![
        Field::new("day", DataType::Date),
        Field::new("order_id", DataType::Int64),
    ]);
    let ds = ingest_parquet_from_path(&path, &schema).unwrap();
    assert_eq!(ds.rows[1], vec![day(2), Value::Int64(2)]);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn ingest_parquet_errors_on_missing_required_column() {
    let path = tmp_file("missing");
    write_orders_parquet(&path);

    let schema = Schema::new(vec![Field::new("customer", DataType::Utf8)]);
    let err = ingest_parquet_from_path(&path, &schema).unwrap_err();
    assert!(err.to_string().contains("missing required column 'customer'"));
    let _ = std::fs::remove_file(&path);
}

#[test]
fn ingest_parquet_errors_on_type_mismatch() {
    let path = tmp_file("type-mismatch");
    write_orders_parquet(&path);

    let schema = Schema::new(vec![Field::new("region", DataType::Int64)]);
    let msg = ingest_parquet_from_path(&path, &schema).unwrap_err().to_string();
    assert!(msg.contains("failed to parse value"));
    assert!(msg.contains("column 'region'"));
    let _ = std::fs::remove_file(&path);
}
