use std::collections::BTreeMap;

use serde_json::{Value, json};

use mupp_schema::{
    AttributeCheck, BuilderStore, EntityKind, Schema, SchemaErrors, SchemaValidation,
    StructuralError,
};

/// Message shown when a form holds nothing besides the seeded field.
pub const ONLY_SEEDED_MESSAGE: &str = "Please add at least one entity to the form.";

/// One field's worth of composer input, collected before it is applied to
/// the store.
#[derive(Debug, Clone)]
pub struct FieldInput {
    pub kind: EntityKind,
    pub label: String,
    pub required: Option<bool>,
    pub weight: Option<i64>,
    pub min: Option<i64>,
    pub max: Option<i64>,
    pub default_value: Option<Value>,
}

impl FieldInput {
    pub fn new(kind: EntityKind, label: impl Into<String>) -> Self {
        Self {
            kind,
            label: label.into(),
            required: None,
            weight: None,
            min: None,
            max: None,
            default_value: None,
        }
    }

    /// Attribute map for the new instance; only attributes the kind accepts
    /// and the composer collected are included.
    pub fn into_attributes(self) -> BTreeMap<String, Value> {
        let mut attributes = BTreeMap::from([(String::from("label"), json!(self.label))]);
        if let Some(required) = self.required
            && self.kind.accepts(mupp_schema::AttributeKind::Required)
        {
            attributes.insert("required".into(), json!(required));
        }
        if self.kind == EntityKind::NumberScale {
            if let Some(weight) = self.weight {
                attributes.insert("weight".into(), json!(weight));
            }
            if let Some(min) = self.min {
                attributes.insert("min".into(), json!(min));
            }
            if let Some(max) = self.max {
                attributes.insert("max".into(), json!(max));
            }
        }
        if let Some(default) = self.default_value {
            attributes.insert("defaultValue".into(), default);
        }
        attributes
    }
}

/// Initial attribute values a freshly added field starts from, per kind.
pub fn initial_attributes(kind: EntityKind) -> BTreeMap<String, Value> {
    match kind {
        EntityKind::TextField => BTreeMap::from([(String::from("label"), json!(""))]),
        EntityKind::NumberScale => BTreeMap::from([
            (String::from("label"), json!("")),
            (String::from("weight"), json!(1)),
            (String::from("min"), json!(1)),
            (String::from("max"), json!(10)),
            (String::from("defaultValue"), json!(5)),
        ]),
        EntityKind::Boolean => BTreeMap::from([
            (String::from("label"), json!("")),
            (String::from("required"), json!(false)),
            (String::from("defaultValue"), json!(false)),
        ]),
        EntityKind::IsLeader => BTreeMap::from([
            (String::from("label"), json!("Are you a leader?")),
            (String::from("defaultValue"), json!(false)),
        ]),
    }
}

/// Adds a composed field to the store and immediately validates each of its
/// attributes, the same way the builder UI re-validates on every update.
/// Returns the new id together with any failed checks.
pub fn apply_field(
    store: &mut BuilderStore,
    input: FieldInput,
) -> Result<(String, Vec<AttributeCheck>), StructuralError> {
    let kind = input.kind;
    let id = store.add_entity(kind, input.into_attributes())?;
    let failures = revalidate_entity(store, &id)?;
    Ok((id, failures))
}

/// Re-runs every attribute validator of one entity, returning the failures.
///
/// Used after any attribute write; a `min`/`max` update in particular must
/// re-check `min` against the sibling bound.
pub fn revalidate_entity(
    store: &mut BuilderStore,
    id: &str,
) -> Result<Vec<AttributeCheck>, StructuralError> {
    let kind = store
        .schema()
        .get(id)
        .ok_or_else(|| StructuralError::UnknownEntity(id.to_string()))?
        .kind;

    let mut failures = Vec::new();
    for attribute in kind.attributes() {
        let check = store.validate_entity_attribute(id, attribute.name())?;
        if !check.is_valid() {
            failures.push(check);
        }
    }
    Ok(failures)
}

/// Why a composed schema cannot be published yet.
#[derive(Debug, Clone, PartialEq)]
pub enum ComposeError {
    /// Only the seeded field is present.
    OnlySeeded,
    Invalid(SchemaErrors),
}

impl std::fmt::Display for ComposeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComposeError::OnlySeeded => f.write_str(ONLY_SEEDED_MESSAGE),
            ComposeError::Invalid(errors) => {
                write!(f, "schema has validation errors in {} entity(ies)", errors.len())
            }
        }
    }
}

impl std::error::Error for ComposeError {}

/// Validates the whole schema and applies the "more than the seeded field"
/// rule, yielding the snapshot that is ready to persist.
pub fn ensure_publishable(store: &mut BuilderStore) -> Result<Schema, ComposeError> {
    match store.validate_schema() {
        SchemaValidation::Valid(schema) => {
            if schema.len() <= 1 {
                Err(ComposeError::OnlySeeded)
            } else {
                Ok(schema)
            }
        }
        SchemaValidation::Invalid(errors) => Err(ComposeError::Invalid(errors)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mupp_schema::{MIN_BELOW_MAX_MESSAGE, Registry};

    #[test]
    fn field_input_builds_scale_attributes() {
        let mut input = FieldInput::new(EntityKind::NumberScale, "Confidence");
        input.weight = Some(2);
        input.min = Some(1);
        input.max = Some(7);
        let attributes = input.into_attributes();
        assert_eq!(attributes["label"], json!("Confidence"));
        assert_eq!(attributes["weight"], json!(2));
        assert_eq!(attributes["max"], json!(7));
        assert!(!attributes.contains_key("required"));
    }

    #[test]
    fn required_flag_is_dropped_for_kinds_without_it() {
        let mut input = FieldInput::new(EntityKind::IsLeader, "Lead?");
        input.required = Some(true);
        assert!(!input.into_attributes().contains_key("required"));
    }

    #[test]
    fn apply_field_surfaces_attribute_failures() {
        let mut store = BuilderStore::seeded(Registry::standard());
        let mut input = FieldInput::new(EntityKind::NumberScale, "Scale");
        input.min = Some(9);
        input.max = Some(3);
        let (_, failures) = apply_field(&mut store, input).expect("apply");
        assert!(
            failures
                .iter()
                .any(|check| check.error.as_ref().is_some_and(|error| {
                    error.message == MIN_BELOW_MAX_MESSAGE
                }))
        );
    }

    #[test]
    fn seeded_only_schema_is_not_publishable() {
        let mut store = BuilderStore::seeded(Registry::standard());
        assert_eq!(ensure_publishable(&mut store), Err(ComposeError::OnlySeeded));

        let (_, failures) =
            apply_field(&mut store, FieldInput::new(EntityKind::TextField, "Name"))
                .expect("apply");
        assert!(failures.is_empty());
        let schema = ensure_publishable(&mut store).expect("publishable");
        assert_eq!(schema.len(), 2);
    }

    #[test]
    fn invalid_fields_block_publishing() {
        let mut store = BuilderStore::seeded(Registry::standard());
        apply_field(&mut store, FieldInput::new(EntityKind::TextField, ""))
            .expect("apply");
        assert!(matches!(
            ensure_publishable(&mut store),
            Err(ComposeError::Invalid(_))
        ));
    }
}
