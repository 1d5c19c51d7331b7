use std::collections::BTreeSet;

use fieldstack_engine::{EngineError, FieldValue, Session};
use fieldstack_model::{AttributeValue, DesiredValues, FieldDefinition, Record, TypedValue};
use fieldstack_storage::{AttributeStore, ChangeSet, SqliteStore, StorageError};
use fieldstack_types::{FieldId, OwnerId, ValueId};
use pretty_assertions::assert_eq;
use serde_json::json;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("fieldstack_engine=debug")
        .with_test_writer()
        .try_init();
}

fn seed(store: &SqliteStore) {
    for def in [
        FieldDefinition::text(42, "issue", "Code"),
        FieldDefinition::text(7, "issue", "Tags").multi(),
        FieldDefinition::date(9, "issue", "Due").with_default("2024-01-01"),
    ] {
        store.put_definition(&def).unwrap();
    }
}

fn live(session: &mut Session<'_, SqliteStore>, id: &OwnerId, field: u64) -> BTreeSet<Option<String>> {
    let mut issue = session.find(id).unwrap();
    session
        .custom_value_for(&mut issue, FieldId::new(field))
        .unwrap()
        .into_iter()
        .map(|v| v.value)
        .collect()
}

#[test]
fn field_42_lifecycle_across_saves() {
    init_tracing();
    let store = SqliteStore::open_in_memory().unwrap();
    seed(&store);

    let mut session = Session::new(&store);
    let mut issue = session.build("issue", json!({"subject": "Crash"}));
    session.assign(&mut issue, &DesiredValues::single(42u64, "Alpha")).unwrap();
    session.save(&mut issue).unwrap();
    let id = issue.id();
    assert_eq!(live(&mut session, &id, 42), BTreeSet::from([Some("Alpha".to_string())]));

    session.assign(&mut issue, &DesiredValues::single(42u64, None::<&str>)).unwrap();
    let outcome = session.save(&mut issue).unwrap();
    assert_eq!((outcome.inserted, outcome.deleted), (1, 1));
    assert!(outcome.touched);
    assert_eq!(live(&mut session, &id, 42), BTreeSet::from([None]));

    session.assign(&mut issue, &DesiredValues::single(42u64, "Alpha")).unwrap();
    session.save(&mut issue).unwrap();
    assert_eq!(live(&mut session, &id, 42), BTreeSet::from([Some("Alpha".to_string())]));
    assert_eq!(store.value_count(&id).unwrap(), 3);
}

#[test]
fn values_survive_reopening_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fields.db");

    let id = {
        let store = SqliteStore::open(&path).unwrap();
        seed(&store);
        let mut session = Session::new(&store);
        let mut issue = session.build("issue", json!({"subject": "Persist"}));
        session
            .assign_json(&mut issue, &json!({"7": ["a", "b"], "9": "2024-06-30"}))
            .unwrap();
        session.save(&mut issue).unwrap();
        issue.id()
    };

    let store = SqliteStore::open(&path).unwrap();
    let mut session = Session::new(&store);
    let mut issue = session.find(&id).unwrap();
    assert_eq!(issue.record().get_str("/subject"), Some("Persist"));
    assert_eq!(
        session.read(&mut issue, "custom_field_9").unwrap(),
        Some(FieldValue::Single(Some(TypedValue::Date(
            chrono::NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
        ))))
    );
    assert_eq!(
        live(&mut session, &id, 7),
        BTreeSet::from([Some("a".to_string()), Some("b".to_string())])
    );
}

#[test]
fn legacy_duplicates_are_cleaned_on_next_assignment() {
    let store = SqliteStore::open_in_memory().unwrap();
    seed(&store);
    let record = Record::new("issue", json!({}));
    let mut changes = ChangeSet::new(record.id);
    changes.owner = Some(record.clone());
    store.commit(&changes).unwrap();
    for value in ["x", "x", "y"] {
        store
            .put_value(&AttributeValue::persisted(
                ValueId::new(),
                record.id,
                FieldId::new(7),
                Some(value.to_string()),
            ))
            .unwrap();
    }

    let mut session = Session::new(&store);
    let mut issue = session.find(&record.id).unwrap();
    let report = session.assign_json(&mut issue, &json!({"7": ["x", "y"]})).unwrap();
    assert_eq!(report.unstaged, 1);
    assert_eq!(report.staged, 0);
    session.save(&mut issue).unwrap();
    assert_eq!(store.value_count(&record.id).unwrap(), 2);
}

#[test]
fn invalid_date_is_rejected_without_writing() {
    let store = SqliteStore::open_in_memory().unwrap();
    seed(&store);

    let mut session = Session::new(&store);
    let mut issue = session.build("issue", json!({}));
    session.assign_json(&mut issue, &json!({"9": "next tuesday"})).unwrap();

    assert!(matches!(session.save(&mut issue), Err(EngineError::Invalid(errors)) if errors.len() == 1));
    assert!(store.load_record(&issue.id()).unwrap().is_none());
    assert_eq!(store.value_count(&issue.id()).unwrap(), 0);
}

#[test]
fn storage_failure_keeps_record_unsaved() {
    let store = SqliteStore::open_in_memory().unwrap();
    seed(&store);
    let mut session = Session::new(&store);
    let mut created = session.build("issue", json!({}));
    session.save(&mut created).unwrap();
    let mut issue = session.find(&created.id()).unwrap();

    // A database that has never seen this record.
    let other = SqliteStore::open_in_memory().unwrap();
    seed(&other);
    let mut elsewhere = Session::new(&other);
    elsewhere
        .assign(&mut issue, &DesiredValues::single(42u64, "late"))
        .unwrap();

    let err = elsewhere.save(&mut issue).unwrap_err();
    assert!(matches!(err, EngineError::Storage(StorageError::NotFound(_))));
    assert!(issue.has_value_changes());
    assert_eq!(other.value_count(&issue.id()).unwrap(), 0);

    session.reload(&mut issue).unwrap();
    session.assign(&mut issue, &DesiredValues::single(42u64, "late")).unwrap();
    let outcome = session.save(&mut issue).unwrap();
    assert_eq!((outcome.inserted, outcome.deleted), (1, 1));
    assert!(outcome.touched);
}
