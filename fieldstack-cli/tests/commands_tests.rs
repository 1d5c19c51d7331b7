use std::fs;

use fieldstack_cli::{create, fields, load_config, load_fields, schema, set, show, SaveReport};
use fieldstack_engine::EngineConfig;
use fieldstack_storage::SqliteStore;
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;

fn setup() -> (TempDir, SqliteStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open(dir.path().join("fields.db")).unwrap();
    let file = dir.path().join("fields.json");
    fs::write(
        &file,
        json!([
            {"id": 42, "entity_type": "issue", "name": "Code", "format": "text", "position": 1},
            {"id": 7, "entity_type": "issue", "name": "Tags", "format": "text", "multi_value": true, "position": 2},
            {"id": 9, "entity_type": "issue", "name": "Blocked", "format": "boolean", "default_value": "0", "position": 3},
            {"id": 11, "entity_type": "issue", "name": "Points", "format": "integer", "required": true, "position": 4}
        ])
        .to_string(),
    )
    .unwrap();
    assert_eq!(load_fields(&store, &file).unwrap(), 4);
    (dir, store)
}

fn created_id(report: &SaveReport) -> String {
    match report {
        SaveReport::Saved { id, .. } => id.to_string(),
        SaveReport::Invalid(errors) => panic!("unexpected validation errors: {errors:?}"),
    }
}

// ── Definitions ──

#[test]
fn fields_and_schema_list_definitions_in_order() {
    let (_dir, store) = setup();

    let listed = fields(&store, "issue").unwrap();
    let ids: Vec<u64> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![42, 7, 9, 11]);

    let form = schema(&store, "issue").unwrap();
    assert_eq!(form[0]["key"], json!("custom_field_42"));
    assert_eq!(form[1]["multiple"], json!(true));
    assert_eq!(form[2]["input"], json!("boolean_input"));
    assert_eq!(form[3]["required"], json!(true));

    assert_eq!(fields(&store, "project").unwrap(), json!([]));
}

// ── Records ──

#[test]
fn create_then_set_then_show() {
    let (_dir, store) = setup();
    let config = EngineConfig::default();

    let report = create(
        &store,
        config.clone(),
        "issue",
        json!({"subject": "Crash"}),
        &json!({"42": "Alpha", "7": ["a", "b"], "11": 5}),
    )
    .unwrap();
    let id = created_id(&report);
    assert_eq!(report.to_json()["created"], json!(true));

    let report = set(&store, config.clone(), &id, &json!([{"id": 7, "value": ["b", "c"]}])).unwrap();
    let out = report.to_json();
    assert_eq!(out["inserted"], json!(1));
    assert_eq!(out["deleted"], json!(1));
    assert_eq!(out["touched"], json!(true));

    let shown = show(&store, config, &id).unwrap();
    assert_eq!(shown["data"]["subject"], json!("Crash"));
    assert_eq!(shown["custom_values"]["42"], json!("Alpha"));
    assert_eq!(shown["custom_values"]["9"], json!("0"));
    assert_eq!(shown["formatted"]["Blocked"], json!("No"));
    assert_eq!(shown["formatted"]["Points"], json!("5"));

    let mut tags: Vec<String> = shown["custom_values"]["7"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect();
    tags.sort();
    assert_eq!(tags, vec!["b", "c"]);
}

#[test]
fn invalid_values_report_errors() {
    let (_dir, store) = setup();

    let report = create(&store, EngineConfig::default(), "issue", json!({}), &json!({"11": "lots"})).unwrap();
    let SaveReport::Invalid(errors) = &report else {
        panic!("expected validation errors");
    };
    assert_eq!(errors.len(), 1);
    assert_eq!(
        report.to_json(),
        json!({"errors": [{"field": "custom_field_11", "kind": "not_an_integer", "params": {}}]})
    );

    let report = create(&store, EngineConfig::default(), "issue", json!({}), &json!({})).unwrap();
    let out = report.to_json();
    assert_eq!(out["errors"][0]["field"], json!("custom_field_11"));
    assert_eq!(out["errors"][0]["kind"], json!("blank"));
}

#[test]
fn bad_ids_are_errors() {
    let (_dir, store) = setup();
    assert!(show(&store, EngineConfig::default(), "not-a-uuid").is_err());
    assert!(set(
        &store,
        EngineConfig::default(),
        "0190f2a4-8b1c-7000-8000-000000000000",
        &json!({"42": "x"})
    )
    .is_err());
}

// ── Config ──

#[test]
fn config_file_overrides_defaults() {
    let dir = tempfile::tempdir().unwrap();
    assert_eq!(load_config(None).unwrap(), EngineConfig::default());

    let path = dir.path().join("engine.json");
    fs::write(&path, r#"{"touch_on_value_change": false}"#).unwrap();
    let config = load_config(Some(&path)).unwrap();
    assert!(!config.touch_on_value_change);
    assert!(config.validate_references);

    fs::write(&path, "not json").unwrap();
    assert!(load_config(Some(&path)).is_err());
    assert!(load_config(Some(&dir.path().join("missing.json"))).is_err());
}
