use serde_json::{Value, json};

use mupp_schema::{EntityKind, Registry, Schema};

fn fixture() -> &'static str {
    include_str!("fixtures/survey_form.json")
}

#[test]
fn wire_round_trip_preserves_schema() {
    let schema: Schema = serde_json::from_str(fixture()).expect("deserialize fixture");
    let encoded = serde_json::to_string(&schema).expect("serialize");
    let decoded: Schema = serde_json::from_str(&encoded).expect("round trip");
    assert_eq!(schema, decoded);
}

#[test]
fn wire_shape_uses_type_and_parent_id_keys() {
    let schema: Schema = serde_json::from_str(fixture()).expect("deserialize fixture");
    let encoded: Value = serde_json::to_value(&schema).expect("to value");

    let nested = &encoded["entities"]["f3a6b7d8-1e2f-4c5d-8a9b-0c1d2e3f4a5b"];
    assert_eq!(nested["type"], json!("textField"));
    assert_eq!(
        nested["parentId"],
        json!("9b2f1c44-7d31-4b6e-8a62-0f4f4f1f2a10")
    );

    // Top-level instances must not carry a parentId key at all.
    let top = &encoded["entities"]["51324b32-adc3-4d17-a90e-66b5453935bd"];
    assert!(top.get("parentId").is_none());
}

#[test]
fn fixture_is_well_formed() {
    let schema: Schema = serde_json::from_str(fixture()).expect("deserialize fixture");
    assert!(schema.ensure_well_formed().is_ok());
}

#[test]
fn unknown_kind_fails_parsing() {
    let raw = json!({
        "entities": {
            "a": { "type": "dropdown", "attributes": { "label": "Pick" } }
        },
        "root": ["a"]
    });
    assert!(serde_json::from_value::<Schema>(raw).is_err());
}

#[test]
fn display_order_follows_root_then_subtrees() {
    let schema: Schema = serde_json::from_str(fixture()).expect("deserialize fixture");
    let order = schema.display_order();
    assert_eq!(
        order,
        vec![
            "51324b32-adc3-4d17-a90e-66b5453935bd".to_string(),
            "9b2f1c44-7d31-4b6e-8a62-0f4f4f1f2a10".into(),
            // the nested email field follows its parent immediately
            "f3a6b7d8-1e2f-4c5d-8a9b-0c1d2e3f4a5b".into(),
            "c6de9a11-52b0-4f89-9f1d-3f8f67f0b7e2".into(),
            "e81d2c03-6f3a-45f7-b7a9-92f3f7d0c551".into(),
        ]
    );
}

#[test]
fn fixture_kinds_are_all_registered() {
    let schema: Schema = serde_json::from_str(fixture()).expect("deserialize fixture");
    let registry = Registry::standard();
    assert!(
        schema
            .entities
            .values()
            .all(|instance| registry.contains(instance.kind))
    );
    assert!(
        schema
            .entities
            .values()
            .any(|instance| instance.kind == EntityKind::IsLeader)
    );
}
