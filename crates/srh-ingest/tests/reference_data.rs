use std::fs;

use srh_ingest::{
    IngestError, IngestOptions, classify_organisations, read_csv, read_csv_with_options,
    unclassified_rows, write_csv,
};
use srh_model::{EngineConfig, Value};

const ORG_REFERENCE: &str = "\
Org_code,Org_name,Parent_code,Parent_name,Entity_code
E06000001,Hartlepool,E12000001,North East,E06
E10000002,Buckinghamshire,E12000008,South East,E10
E07000004,Aylesbury Vale,E12000008,South East,E07
X99000001,Unknown body,E12000008,South East,X99
";

#[test]
fn unclassified_reference_rows_are_exported_before_failing() {
    let dir = tempfile::tempdir().expect("temp dir");
    let source = dir.path().join("org_reference.csv");
    fs::write(&source, ORG_REFERENCE).expect("write source");

    let options = IngestOptions::default().with_expected_columns([
        "Org_code",
        "Org_name",
        "Parent_code",
        "Parent_name",
        "Entity_code",
    ]);
    let data = read_csv_with_options(&source, &options).expect("read reference");
    assert_eq!(data.height(), 4);

    let rules = EngineConfig::default().org_classification;
    let offending = unclassified_rows(&data, "Org_code", &rules).expect("offending rows");
    let export = dir.path().join("new_codes.csv");
    write_csv(&offending, &export).expect("export");

    let exported = read_csv(&export).expect("read export");
    assert_eq!(exported.height(), 1);
    assert_eq!(exported.value(0, "Org_name"), Some(&Value::from("Unknown body")));

    let err = classify_organisations(data, "Org_code", &rules).unwrap_err();
    assert!(matches!(err, IngestError::UnclassifiedCodes { ref codes, .. } if codes == &["X99000001".to_string()]));
}

#[test]
fn classified_reference_gains_type_columns() {
    let dir = tempfile::tempdir().expect("temp dir");
    let source = dir.path().join("org_reference.csv");
    let valid: String = ORG_REFERENCE
        .lines()
        .filter(|line| !line.starts_with("X99"))
        .map(|line| format!("{line}\n"))
        .collect();
    fs::write(&source, valid).expect("write source");

    let data = read_csv(&source).expect("read reference");
    let rules = EngineConfig::default().org_classification;
    let classified = classify_organisations(data, "Org_code", &rules).expect("classify");
    assert!(classified.has_field("Org_type"));
    assert!(classified.has_field("Org_level"));
    assert_eq!(
        classified.require("Org_type").expect("Org_type"),
        [Value::from("LA"), Value::from("LA"), Value::from("LA")]
    );
}
