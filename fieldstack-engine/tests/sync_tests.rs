use std::collections::BTreeSet;

use fieldstack_engine::{SyncEngine, ValueStore};
use fieldstack_model::{AttributeValue, DesiredValues, FieldDefinition, RawValue};
use fieldstack_types::{FieldId, OwnerId, ValueId};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;

fn definitions() -> Vec<FieldDefinition> {
    vec![
        FieldDefinition::text(42, "issue", "Code"),
        FieldDefinition::text(7, "issue", "Tags").multi(),
        FieldDefinition::integer(8, "issue", "Points").with_default("3"),
    ]
}

fn live(store: &ValueStore, field: u64) -> Vec<Option<String>> {
    store
        .current_values(FieldId::new(field))
        .map(|v| v.value.clone())
        .collect()
}

fn live_set(store: &ValueStore, field: u64) -> BTreeSet<String> {
    store
        .current_values(FieldId::new(field))
        .filter_map(|v| v.value.clone())
        .collect()
}

fn persisted(owner: OwnerId, field: u64, value: Option<&str>) -> AttributeValue {
    AttributeValue::persisted(ValueId::new(), owner, FieldId::new(field), value.map(String::from))
}

// ── Single-valued fields ─────────────────────────────────────────

#[test]
fn field_42_placeholder_walkthrough() {
    let defs = definitions();
    let engine = SyncEngine::new(&defs);
    let mut store = ValueStore::new();

    engine.assign(&mut store, &DesiredValues::single(42u64, "Alpha"));
    assert_eq!(live(&store, 42), vec![Some("Alpha".to_string())]);

    engine.assign(&mut store, &DesiredValues::single(42u64, None::<&str>));
    assert_eq!(live(&store, 42), vec![None]);
    let removed: Vec<Option<String>> = store.removed().map(|v| v.value.clone()).collect();
    assert_eq!(removed, vec![Some("Alpha".to_string())]);

    engine.assign(&mut store, &DesiredValues::single(42u64, "Alpha"));
    assert_eq!(live(&store, 42), vec![Some("Alpha".to_string())]);
    assert_eq!(store.removed().count(), 2);
    assert!(store.removed().any(|v| v.value.is_none()));
}

#[test]
fn empty_single_assignment_creates_one_placeholder() {
    let defs = definitions();
    let engine = SyncEngine::new(&defs);
    let mut store = ValueStore::new();

    let report = engine.assign(&mut store, &DesiredValues::new().with(42u64, Vec::<RawValue>::new()));
    assert_eq!(report.staged, 1);
    assert_eq!(live(&store, 42), vec![None]);

    let again = engine.assign(&mut store, &DesiredValues::new().with(42u64, Vec::<RawValue>::new()));
    assert!(again.is_noop());
    assert_eq!(live(&store, 42), vec![None]);
}

#[test]
fn single_valued_field_keeps_last_value() {
    let defs = definitions();
    let engine = SyncEngine::new(&defs);
    let mut store = ValueStore::new();

    engine.assign(&mut store, &DesiredValues::new().with(42u64, ["a", "b", "c"]));
    assert_eq!(live(&store, 42), vec![Some("c".to_string())]);
}

#[test]
fn null_elements_are_dropped() {
    let defs = definitions();
    let engine = SyncEngine::new(&defs);
    let mut store = ValueStore::new();

    engine.assign(&mut store, &DesiredValues::from_json(&json!({"42": [null, "x", null]})));
    assert_eq!(live(&store, 42), vec![Some("x".to_string())]);
}

#[test]
fn values_compare_by_string_form() {
    let defs = definitions();
    let engine = SyncEngine::new(&defs);
    let mut store = ValueStore::from_persisted([persisted(OwnerId::new(), 8, Some("1"))]);

    let report = engine.assign(&mut store, &DesiredValues::single(8u64, 1i64));
    assert!(report.is_noop());
    let report = engine.assign(&mut store, &DesiredValues::from_json(&json!({"8": "1"})));
    assert!(report.is_noop());
}

// ── Multi-valued fields ──────────────────────────────────────────

#[test]
fn multi_valued_replacement_keeps_common_values() {
    let defs = definitions();
    let engine = SyncEngine::new(&defs);
    let owner = OwnerId::new();
    let mut store = ValueStore::from_persisted([
        persisted(owner, 7, Some("v1")),
        persisted(owner, 7, Some("v2")),
        persisted(owner, 7, Some("v3")),
    ]);
    let v2_handle = store.handles_for(FieldId::new(7))[1];

    let report = engine.assign(&mut store, &DesiredValues::new().with(7u64, ["v2", "v4"]));
    assert_eq!(report.staged, 1);
    assert_eq!(report.unstaged, 2);
    assert_eq!(live_set(&store, 7), BTreeSet::from(["v2".to_string(), "v4".to_string()]));
    assert!(store.get(v2_handle).is_some_and(|v| v.is_persisted()));

    let removed: BTreeSet<String> = store.removed().filter_map(|v| v.value.clone()).collect();
    assert_eq!(removed, BTreeSet::from(["v1".to_string(), "v3".to_string()]));

    let again = engine.assign(&mut store, &DesiredValues::new().with(7u64, ["v2", "v4"]));
    assert!(again.is_noop());
}

#[test]
fn duplicate_desired_values_collapse() {
    let defs = definitions();
    let engine = SyncEngine::new(&defs);
    let mut store = ValueStore::new();

    let report = engine.assign(&mut store, &DesiredValues::new().with(7u64, ["a", "b", "a"]));
    assert_eq!(report.staged, 2);
    assert_eq!(live(&store, 7), vec![Some("a".to_string()), Some("b".to_string())]);
}

#[test]
fn clearing_multi_valued_field_leaves_placeholder() {
    let defs = definitions();
    let engine = SyncEngine::new(&defs);
    let owner = OwnerId::new();
    let mut store = ValueStore::from_persisted([persisted(owner, 7, Some("a")), persisted(owner, 7, Some("b"))]);

    engine.assign(&mut store, &DesiredValues::from_json(&json!({"7": []})));
    assert_eq!(live(&store, 7), vec![None]);
    assert_eq!(store.pending_deletes().count(), 2);
}

#[test]
fn legacy_duplicate_rows_are_collapsed() {
    let defs = definitions();
    let engine = SyncEngine::new(&defs);
    let owner = OwnerId::new();
    let mut store = ValueStore::from_persisted([
        persisted(owner, 7, Some("a")),
        persisted(owner, 7, Some("a")),
        persisted(owner, 7, Some("b")),
    ]);

    let report = engine.assign(&mut store, &DesiredValues::new().with(7u64, ["a"]));
    assert_eq!(report.unstaged, 2);
    assert_eq!(live(&store, 7), vec![Some("a".to_string())]);
}

// ── Ignored input ────────────────────────────────────────────────

#[test]
fn empty_assignment_is_a_noop() {
    let defs = definitions();
    let mut store = ValueStore::new();
    let report = SyncEngine::new(&defs).assign(&mut store, &DesiredValues::new());
    assert!(report.is_noop());
    assert!(store.is_empty());
}

#[test]
fn unknown_keys_are_ignored() {
    let defs = definitions();
    let engine = SyncEngine::new(&defs);
    let mut store = ValueStore::new();

    let report = engine.assign(
        &mut store,
        &DesiredValues::from_json(&json!({"999": "x", "subject": "y", "42": "z"})),
    );
    assert_eq!(report.staged, 1);
    assert_eq!(store.len(), 1);
    assert!(!store.has_any(FieldId::new(999)));
}

// ── Defaults ─────────────────────────────────────────────────────

#[test]
fn ensure_complete_stages_defaults_once() {
    let defs = definitions();
    let engine = SyncEngine::new(&defs);
    let mut store = ValueStore::new();
    engine.assign(&mut store, &DesiredValues::single(42u64, "Alpha"));

    assert_eq!(engine.ensure_complete(&mut store), 2);
    assert_eq!(live(&store, 8), vec![Some("3".to_string())]);
    assert_eq!(live(&store, 7), vec![None]);
    assert_eq!(live(&store, 42), vec![Some("Alpha".to_string())]);

    assert_eq!(engine.ensure_complete(&mut store), 0);
}

#[test]
fn ensure_complete_skips_fields_with_removed_rows() {
    let defs = definitions();
    let engine = SyncEngine::new(&defs);
    let mut store = ValueStore::from_persisted([persisted(OwnerId::new(), 8, Some("5"))]);
    let handle = store.handles_for(FieldId::new(8))[0];
    store.unstage(handle);

    engine.ensure_complete(&mut store);
    assert!(live(&store, 8).is_empty());
}

// ── Properties ───────────────────────────────────────────────────

fn value_lists() -> impl Strategy<Value = Vec<Vec<Option<String>>>> {
    prop::collection::vec(
        prop::collection::vec(prop::option::weighted(0.8, "[a-d]"), 0..4),
        1..6,
    )
}

proptest! {
    #[test]
    fn single_valued_field_holds_exactly_one_live_row(calls in value_lists()) {
        let defs = definitions();
        let engine = SyncEngine::new(&defs);
        let mut store = ValueStore::new();

        for values in &calls {
            let desired = DesiredValues::new().with(42u64, values.clone());
            engine.assign(&mut store, &desired);

            let rows = live(&store, 42);
            prop_assert_eq!(rows.len(), 1);
            let expected = values.iter().rev().find_map(|v| v.clone());
            prop_assert_eq!(rows[0].clone(), expected);
        }
    }

    #[test]
    fn multi_valued_field_matches_desired_set(calls in value_lists()) {
        let defs = definitions();
        let engine = SyncEngine::new(&defs);
        let mut store = ValueStore::new();

        for values in &calls {
            let desired = DesiredValues::new().with(7u64, values.clone());
            engine.assign(&mut store, &desired);

            let expected: BTreeSet<String> = values.iter().flatten().cloned().collect();
            prop_assert_eq!(live_set(&store, 7), expected.clone());
            let rows = live(&store, 7);
            let non_nil = rows.iter().filter(|v| v.is_some()).count();
            prop_assert_eq!(non_nil, expected.len());
            prop_assert_eq!(rows.len() - non_nil, usize::from(expected.is_empty()));
        }
    }

    #[test]
    fn second_identical_assignment_stages_nothing(first in value_lists(), second in value_lists()) {
        let defs = definitions();
        let engine = SyncEngine::new(&defs);
        let mut store = ValueStore::new();

        let desired = DesiredValues::new()
            .with(42u64, first[0].clone())
            .with(7u64, second[0].clone());
        engine.assign(&mut store, &desired);
        let again = engine.assign(&mut store, &desired);
        prop_assert!(again.is_noop());
    }
}
