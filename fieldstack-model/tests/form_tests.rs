use fieldstack_model::{form_schema, FieldDefinition, FieldFormat, InputKind};
use pretty_assertions::assert_eq;

#[test]
fn input_kind_follows_format() {
    assert_eq!(InputKind::from(FieldFormat::Text), InputKind::TextInput);
    assert_eq!(InputKind::from(FieldFormat::Date), InputKind::DateInput);
    assert_eq!(InputKind::from(FieldFormat::MultiReference), InputKind::SelectInput);
}

#[test]
fn schema_lists_visible_fields_by_position() {
    let defs = vec![
        FieldDefinition::text(1, "project", "Late").with_position(9),
        FieldDefinition::boolean(2, "project", "Secret").hidden(),
        FieldDefinition::multi_reference(3, "project", "Reviewers").with_position(1).required(),
    ];
    let schema = form_schema(&defs);
    let keys: Vec<&str> = schema.iter().map(|f| f.key.as_str()).collect();
    assert_eq!(keys, vec!["custom_field_3", "custom_field_1"]);
    assert!(schema[0].multiple);
    assert!(schema[0].required);
    assert_eq!(schema[0].input, InputKind::SelectInput);
    assert_eq!(schema[1].label, "Late");
}

#[test]
fn schema_serializes_snake_case() {
    let defs = vec![FieldDefinition::formattable(4, "project", "Notes")];
    let json = serde_json::to_value(form_schema(&defs)).unwrap();
    assert_eq!(json[0]["input"], "formattable_input");
    assert_eq!(json[0]["field_type"], "formattable_text");
}
