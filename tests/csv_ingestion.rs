use chrono::NaiveDate;

use dataops_engine::ingestion::csv::{
    ingest_csv_from_path, ingest_csv_from_reader, ingest_csv_inferred_from_path,
};
use dataops_engine::ingestion::infer_csv_schema;
use dataops_engine::types::{DataType, Field, Schema, Value};

fn sales_schema() -> Schema {
    Schema::new(vec![
        Field::new("order_id", DataType::Int64),
        Field::new("date", DataType::Date),
        Field::new("region", DataType::Utf8),
        Field::new("revenue", DataType::Float64),
    ])
}

fn reader(input: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(input.as_bytes())
}

#[test]
fn ingest_csv_from_path_happy_path() {
    let ds = ingest_csv_from_path("tests/fixtures/sales.csv", &sales_schema()).unwrap();

    assert_eq!(ds.row_count(), 5);
    assert_eq!(ds.column_count(), 4);
    assert_eq!(
        ds.rows[0],
        vec![
            Value::Int64(1),
            Value::Date(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()),
            Value::str("APAC"),
            Value::Float64(1000.0),
        ]
    );
}

#[test]
fn ingest_csv_allows_reordered_columns() {
    let mut rdr = reader("region,revenue,date,order_id\nEMEA,800,2025-01-01,2\n");
    let ds = ingest_csv_from_reader(&mut rdr, &sales_schema()).unwrap();
    assert_eq!(ds.rows[0][0], Value::Int64(2));
    assert_eq!(ds.rows[0][2], Value::str("EMEA"));
}

#[test]
fn ingest_csv_maps_empty_cells_to_null() {
    let mut rdr = reader("order_id,date,region,revenue\n1,,  ,\n");
    let ds = ingest_csv_from_reader(&mut rdr, &sales_schema()).unwrap();
    assert_eq!(
        ds.rows[0],
        vec![Value::Int64(1), Value::Null, Value::Null, Value::Null]
    );
}

#[test]
fn ingest_csv_errors_on_missing_required_column() {
    let mut rdr = reader("order_id,date,revenue\n1,2025-01-01,5\n");
    let msg = ingest_csv_from_reader(&mut rdr, &sales_schema())
        .unwrap_err()
        .to_string();
    assert!(msg.contains("schema mismatch"));
    assert!(msg.contains("missing required column 'region'"));
}

#[test]
fn ingest_csv_errors_on_bad_dates() {
    let mut rdr = reader("order_id,date,region,revenue\n1,01/02/2025,APAC,5\n");
    let msg = ingest_csv_from_reader(&mut rdr, &sales_schema())
        .unwrap_err()
        .to_string();
    assert!(msg.contains("failed to parse value at row 2"));
    assert!(msg.contains("column 'date'"));
}

#[test]
fn infer_csv_schema_picks_narrowest_types() {
    let schema = infer_csv_schema("tests/fixtures/sales.csv").unwrap();
    assert_eq!(
        schema,
        Schema::new(vec![
            Field::new("order_id", DataType::Int64),
            Field::new("date", DataType::Date),
            Field::new("region", DataType::Utf8),
            Field::new("revenue", DataType::Int64),
            Field::new("product_id", DataType::Utf8),
        ])
    );
}

#[test]
fn inferred_ingest_keeps_quoted_commas() {
    let ds = ingest_csv_inferred_from_path("tests/fixtures/regions.csv").unwrap();
    assert_eq!(ds.row_count(), 3);
    assert_eq!(
        ds.column("region_name").unwrap()[1],
        Value::str("Europe, Middle East & Africa")
    );
}
