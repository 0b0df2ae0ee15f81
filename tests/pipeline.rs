use std::fs;

use rowsieve::data::codec;
use rowsieve::data::loader::{load_file, save_file};
use rowsieve::{CodecError, EngineError, FilterEngine, Format, SchemaError, TabularDataset, Value};

fn adults_row() -> TabularDataset {
    TabularDataset::try_new(
        vec!["age".into(), "name".into()],
        vec![vec![Value::Integer(30), Value::from("A")]],
    )
    .unwrap()
}

#[test]
fn end_to_end_csv_to_json() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("people.csv");
    fs::write(&input, "age,name\n30,A\n15,B\n").unwrap();

    let mut engine = FilterEngine::default();
    load_file(&mut engine, &input, Some(Format::Csv)).unwrap();

    engine.add_filter("age >= 18").unwrap();
    engine.apply_filters().unwrap();
    assert_eq!(engine.filtered(), Some(&adults_row()));

    engine.add_filter("name == \"A\"").unwrap();
    engine.apply_filters().unwrap();
    assert_eq!(engine.filtered(), Some(&adults_row()));

    let output = dir.path().join("adults.json");
    assert_eq!(save_file(&engine, &output, None).unwrap(), Format::Json);

    let written = fs::read(&output).unwrap();
    assert_eq!(codec::decode(&written, Format::Json).unwrap(), adults_row());
}

#[test]
fn end_to_end_through_parquet() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("scores.jsonl");
    fs::write(
        &input,
        "{\"team\": \"red\", \"score\": 12.5, \"active\": true}\n\
         {\"team\": \"blue\", \"score\": 3, \"active\": false}\n\
         {\"team\": \"green\", \"active\": true}\n",
    )
    .unwrap();

    let mut engine = FilterEngine::default();
    load_file(&mut engine, &input, None).unwrap();
    engine.add_filter("active").unwrap();
    engine.add_filter("score != null").unwrap();
    let summary = engine.apply_filters().unwrap();
    assert_eq!(summary.kept_rows, 1);

    let output = dir.path().join("kept.parquet");
    save_file(&engine, &output, Some(Format::Columnar)).unwrap();

    let back = codec::decode(&fs::read(&output).unwrap(), Format::Columnar).unwrap();
    assert_eq!(back.columns(), ["team", "score", "active"]);
    assert_eq!(back.value(0, "team"), Some(&Value::from("red")));
    assert_eq!(back.value(0, "score"), Some(&Value::Float(12.5)));
}

#[test]
fn short_csv_line_leaves_prior_dataset() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("good.csv");
    let bad = dir.path().join("bad.csv");
    fs::write(&good, "age,name\n30,A\n").unwrap();
    fs::write(&bad, "age,name\n30,A\n15\n").unwrap();

    let mut engine = FilterEngine::default();
    load_file(&mut engine, &good, None).unwrap();

    let err = load_file(&mut engine, &bad, None).unwrap_err();
    let engine_err = err.downcast_ref::<EngineError>().unwrap();
    assert!(matches!(
        engine_err,
        EngineError::Codec(CodecError::SchemaMismatch(SchemaError::RowWidth { .. }))
    ));
    assert_eq!(engine.original().unwrap().len(), 1);
}

#[test]
fn extension_and_label_must_agree() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("people.csv");
    fs::write(&input, "age\n1\n").unwrap();

    let mut engine = FilterEngine::default();
    assert!(load_file(&mut engine, &input, Some(Format::Columnar)).is_err());
    assert!(engine.original().is_none());
}

#[test]
fn failed_save_keeps_filtered_result() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("mixed.json");
    fs::write(&input, r#"[{"v": 1}, {"v": "one"}]"#).unwrap();

    let mut engine = FilterEngine::default();
    load_file(&mut engine, &input, None).unwrap();
    engine.apply_filters().unwrap();

    // a column holding numbers and strings has no Parquet type
    let err = save_file(&engine, &dir.path().join("out.parquet"), None).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<EngineError>(),
        Some(EngineError::Codec(CodecError::UnsupportedValueType { .. }))
    ));
    assert!(!dir.path().join("out.parquet").exists());

    // retry with another format
    save_file(&engine, &dir.path().join("out.csv"), None).unwrap();
    assert_eq!(engine.filtered().unwrap().len(), 2);
}
