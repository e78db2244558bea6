use std::collections::BTreeMap;

use serde_json::{Value, json};

use mupp_schema::{
    AnswersValidation, EntityInstance, EntityKind, InterpreterStore, Registry, Schema,
    StructuralError, build_render_payload, render_json, render_text,
};

fn entity(kind: EntityKind, attrs: &[(&str, Value)]) -> EntityInstance {
    EntityInstance::with_attributes(
        kind,
        attrs
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect::<BTreeMap<_, _>>(),
    )
}

fn schema_of(entries: Vec<(&str, EntityInstance)>) -> Schema {
    let mut schema = Schema::new();
    for (id, instance) in entries {
        schema.root.push(id.to_string());
        schema.entities.insert(id.to_string(), instance);
    }
    schema
}

fn store_of(entries: Vec<(&str, EntityInstance)>) -> InterpreterStore {
    InterpreterStore::new(&Registry::standard(), schema_of(entries)).expect("valid schema")
}

#[test]
fn construction_fails_fast_on_malformed_schema() {
    let mut schema = Schema::new();
    schema.root.push("ghost".into());
    assert!(matches!(
        InterpreterStore::new(&Registry::standard(), schema),
        Err(StructuralError::DanglingRoot(_))
    ));
}

#[test]
fn construction_fails_on_unregistered_kind() {
    let schema = schema_of(vec![(
        "scale",
        entity(EntityKind::NumberScale, &[("label", json!("Scale"))]),
    )]);
    let narrow = Registry::with_kinds(vec![EntityKind::TextField]);
    assert_eq!(
        InterpreterStore::new(&narrow, schema).err(),
        Some(StructuralError::UnknownKind("numberScale".into()))
    );
}

#[test]
fn set_value_rejects_unknown_entity() {
    let mut store = store_of(vec![(
        "name",
        entity(EntityKind::TextField, &[("label", json!("Name"))]),
    )]);
    assert_eq!(
        store.set_entity_value("ghost", json!("x")),
        Err(StructuralError::UnknownEntity("ghost".into()))
    );
}

#[test]
fn number_scale_accepts_exactly_the_inclusive_range() {
    let mut store = store_of(vec![(
        "scale",
        entity(
            EntityKind::NumberScale,
            &[("label", json!("Scale")), ("min", json!(2)), ("max", json!(5))],
        ),
    )]);

    for valid in 2..=5 {
        store.set_entity_value("scale", json!(valid)).expect("set");
        let check = store.validate_entity_value("scale").expect("validate");
        assert!(check.is_valid(), "{valid} should pass");
    }
    for invalid in [1, 6, -1] {
        store.set_entity_value("scale", json!(invalid)).expect("set");
        let check = store.validate_entity_value("scale").expect("validate");
        assert!(!check.is_valid(), "{invalid} should fail");
    }
    store.set_entity_value("scale", json!(3.5)).expect("set");
    assert!(!store.validate_entity_value("scale").expect("validate").is_valid());
    store.set_entity_value("scale", json!("3")).expect("set");
    assert!(!store.validate_entity_value("scale").expect("validate").is_valid());
}

#[test]
fn scale_default_is_used_for_display_and_validation() {
    let mut store = store_of(vec![(
        "scale",
        entity(
            EntityKind::NumberScale,
            &[("label", json!("Scale")), ("min", json!(1)), ("max", json!(10))],
        ),
    )]);

    // Unanswered: the midpoint default stands in.
    assert_eq!(store.effective_value("scale"), Some(json!(5)));
    assert!(store.validate_entity_value("scale").expect("validate").is_valid());

    let result = store.validate_entities_values();
    let answers = result.into_answers().expect("valid");
    assert_eq!(answers["scale"], json!(5));

    // An explicit answer overrides the default.
    store.set_entity_value("scale", json!(9)).expect("set");
    assert_eq!(store.effective_value("scale"), Some(json!(9)));
    store.clear_entity_value("scale").expect("clear");
    assert_eq!(store.effective_value("scale"), Some(json!(5)));
}

#[test]
fn required_text_field_blocks_submission_until_answered() {
    let mut store = store_of(vec![(
        "name",
        entity(
            EntityKind::TextField,
            &[("label", json!("Name")), ("required", json!(true))],
        ),
    )]);

    let result = store.validate_entities_values();
    let AnswersValidation::Invalid(errors) = result else {
        panic!("expected failure");
    };
    assert!(errors.contains_key("name"));
    assert!(store.entity_error("name").is_some());

    store.set_entity_value("name", json!("")).expect("set");
    assert!(!store.validate_entity_value("name").expect("validate").is_valid());

    store.set_entity_value("name", json!("Ada")).expect("set");
    assert!(store.validate_entity_value("name").expect("validate").is_valid());

    let answers = store
        .validate_entities_values()
        .into_answers()
        .expect("valid");
    assert_eq!(answers["name"], json!("Ada"));
}

#[test]
fn optional_text_field_may_stay_unanswered() {
    let mut store = store_of(vec![(
        "nickname",
        entity(EntityKind::TextField, &[("label", json!("Nickname"))]),
    )]);
    let answers = store
        .validate_entities_values()
        .into_answers()
        .expect("valid");
    // No default and no answer: the field is simply absent.
    assert!(!answers.contains_key("nickname"));
}

#[test]
fn boolean_default_satisfies_required_flag() {
    let mut store = store_of(vec![(
        "weekend",
        entity(
            EntityKind::Boolean,
            &[("label", json!("Weekends?")), ("required", json!(true))],
        ),
    )]);

    // The implicit false default counts as answered.
    let answers = store
        .validate_entities_values()
        .into_answers()
        .expect("valid");
    assert_eq!(answers["weekend"], json!(false));

    store.set_entity_value("weekend", json!("yes")).expect("set");
    assert!(!store.validate_entity_value("weekend").expect("validate").is_valid());
}

#[test]
fn leader_marker_never_blocks_submission() {
    let mut store = store_of(vec![(
        "leader",
        entity(
            EntityKind::IsLeader,
            &[("label", json!("Are you a leader?")), ("defaultValue", json!(false))],
        ),
    )]);
    let answers = store
        .validate_entities_values()
        .into_answers()
        .expect("valid");
    assert_eq!(answers["leader"], json!(false));

    store.set_entity_value("leader", json!(true)).expect("set");
    let answers = store
        .validate_entities_values()
        .into_answers()
        .expect("valid");
    assert_eq!(answers["leader"], json!(true));
}

#[test]
fn render_payload_reflects_store_state() {
    let mut store = store_of(vec![
        (
            "name",
            entity(
                EntityKind::TextField,
                &[("label", json!("Name")), ("required", json!(true))],
            ),
        ),
        (
            "scale",
            entity(EntityKind::NumberScale, &[("label", json!("Confidence"))]),
        ),
    ]);
    store.set_entity_value("name", json!("Ada")).expect("set");
    store.validate_entity_value("name").expect("validate");

    let payload = build_render_payload(&store);
    assert_eq!(payload.total, 2);
    assert_eq!(payload.answered, 1);
    assert_eq!(payload.fields[0].label, "Name");
    assert!(payload.fields[0].required);
    assert_eq!(payload.fields[1].value, Some(json!(5)));

    let text = render_text(&payload);
    assert!(text.contains("Answered: 1/2"));
    assert!(text.contains("Name"));

    let ui = render_json(&payload);
    assert_eq!(ui["progress"]["answered"], json!(1));
    assert_eq!(ui["fields"][1]["type"], json!("numberScale"));
}
