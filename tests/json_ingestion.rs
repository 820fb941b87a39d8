use chrono::NaiveDate;

use dataops_engine::ingestion::json::{
    ingest_json_from_path, ingest_json_from_str, ingest_json_inferred_from_path,
};
use dataops_engine::types::{DataType, Field, Schema, Value};

fn orders_schema() -> Schema {
    Schema::new(vec![
        Field::new("order_id", DataType::Int64),
        Field::new("date", DataType::Date),
        Field::new("meta.channel", DataType::Utf8),
        Field::new("revenue", DataType::Float64),
    ])
}

#[test]
fn ingest_json_array_with_nested_paths() {
    let input = r#"[
        {"order_id": 1, "date": "2025-01-01", "meta": {"channel": "web"}, "revenue": 10},
        {"order_id": 2, "date": null, "meta": {"channel": "store"}, "revenue": 2.5}
    ]"#;
    let ds = ingest_json_from_str(input, &orders_schema()).unwrap();
    assert_eq!(ds.row_count(), 2);
    assert_eq!(
        ds.rows[0],
        vec![
            Value::Int64(1),
            Value::Date(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()),
            Value::str("web"),
            Value::Float64(10.0),
        ]
    );
    assert_eq!(ds.rows[1][1], Value::Null);
}

#[test]
fn ingest_json_single_object() {
    let input = r#"{"order_id": 7, "date": "2025-02-03", "meta": {"channel": "web"}, "revenue": 1}"#;
    let ds = ingest_json_from_str(input, &orders_schema()).unwrap();
    assert_eq!(ds.row_count(), 1);
}

#[test]
fn ingest_json_errors_on_missing_field() {
    let schema = orders_schema();
    let input = r#"[{"order_id": 1, "date": "2025-01-01", "revenue": 1}]"#;
    let msg = ingest_json_from_str(input, &schema).unwrap_err().to_string();
    assert!(msg.contains("schema mismatch"));
    assert!(msg.contains("missing required field 'meta.channel'"));
}

#[test]
fn ingest_json_errors_on_type_mismatch() {
    let input = r#"[{"order_id": "one", "date": "2025-01-01", "meta": {"channel": "web"}, "revenue": 1}]"#;
    let msg = ingest_json_from_str(input, &orders_schema())
        .unwrap_err()
        .to_string();
    assert!(msg.contains("failed to parse value"));
    assert!(msg.contains("column 'order_id'"));
}

#[test]
fn ndjson_fixture_with_schema_and_inferred() {
    let schema = Schema::new(vec![
        Field::new("order_id", DataType::Int64),
        Field::new("revenue", DataType::Float64),
    ]);
    let ds = ingest_json_from_path("tests/fixtures/sales.ndjson", &schema).unwrap();
    assert_eq!(ds.row_count(), 3);
    assert_eq!(ds.rows[1][1], Value::Float64(800.5));

    let inferred = ingest_json_inferred_from_path("tests/fixtures/sales.ndjson").unwrap();
    let fields: Vec<(&str, DataType)> = inferred
        .schema
        .fields
        .iter()
        .map(|f| (f.name.as_str(), f.data_type))
        .collect();
    assert_eq!(
        fields,
        vec![
            ("order_id", DataType::Int64),
            ("date", DataType::Date),
            ("region", DataType::Utf8),
            ("revenue", DataType::Float64),
            ("meta", DataType::Utf8),
        ]
    );
    assert_eq!(inferred.rows[0][4], Value::str(r#"{"channel":"web"}"#));
    assert_eq!(inferred.rows[2][4], Value::Null);
}
