use std::collections::BTreeMap;

use serde_json::{Value, json};
use uuid::Uuid;

use crate::attribute::AttributeKind;
use crate::entity::EntityKind;
use crate::error::{StructuralError, ValidationError};
use crate::registry::Registry;
use crate::schema::{EntityInstance, Schema};

/// What a builder mutation changed, handed back so the caller can decide
/// whether to re-validate (`add_entity` returns the new id instead). There
/// is no subscription mechanism: reacting to these is optional and only
/// affects feedback timeliness, never correctness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuilderEvent {
    /// `removed` lists every id taken out, the deleted entity first and its
    /// descendants after it.
    EntityDeleted {
        id: String,
        removed: Vec<String>,
    },
    AttributeUpdated {
        entity_id: String,
        attribute: AttributeKind,
    },
}

/// Outcome of validating a single attribute, returned as data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeCheck {
    pub entity_id: String,
    pub attribute: AttributeKind,
    pub error: Option<ValidationError>,
}

impl AttributeCheck {
    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-entity, per-attribute error map produced by a full schema pass.
pub type SchemaErrors = BTreeMap<String, BTreeMap<String, ValidationError>>;

/// Result of validating the whole schema.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaValidation {
    /// Every attribute of every entity passed; the schema snapshot is ready
    /// to serialize for the backend.
    Valid(Schema),
    Invalid(SchemaErrors),
}

impl SchemaValidation {
    pub fn is_valid(&self) -> bool {
        matches!(self, SchemaValidation::Valid(_))
    }

    pub fn into_schema(self) -> Option<Schema> {
        match self {
            SchemaValidation::Valid(schema) => Some(schema),
            SchemaValidation::Invalid(_) => None,
        }
    }

    pub fn errors(&self) -> Option<&SchemaErrors> {
        match self {
            SchemaValidation::Valid(_) => None,
            SchemaValidation::Invalid(errors) => Some(errors),
        }
    }
}

/// Mutable editing session over one schema.
///
/// Owns the schema for the duration of a form-authoring session and is the
/// only way to mutate it. Writes are raw (dirty-but-unvalidated states are
/// legal); validation is a separate, explicitly triggered step whose
/// outcomes are cached per (entity, attribute).
#[derive(Debug, Clone)]
pub struct BuilderStore {
    registry: Registry,
    schema: Schema,
    errors: SchemaErrors,
}

impl BuilderStore {
    /// An empty editing session.
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            schema: Schema::new(),
            errors: SchemaErrors::new(),
        }
    }

    /// An editing session with the default seeded field every form starts
    /// with: a leader marker asking "Are you a leader?".
    pub fn seeded(registry: Registry) -> Self {
        let mut store = Self::new(registry);
        let id = Uuid::new_v4().to_string();
        store.schema.entities.insert(
            id.clone(),
            EntityInstance::with_attributes(
                EntityKind::IsLeader,
                BTreeMap::from([
                    (String::from("label"), json!("Are you a leader?")),
                    (String::from("defaultValue"), json!(false)),
                ]),
            ),
        );
        store.schema.root.push(id);
        store
    }

    /// Resume editing a previously persisted schema.
    pub fn from_schema(registry: Registry, schema: Schema) -> Result<Self, StructuralError> {
        schema.ensure_well_formed()?;
        for instance in schema.entities.values() {
            if !registry.contains(instance.kind) {
                return Err(StructuralError::UnknownKind(instance.kind.tag().to_string()));
            }
        }
        Ok(Self {
            registry,
            schema,
            errors: SchemaErrors::new(),
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Cached validation error for one attribute, if the last check failed.
    pub fn attribute_error(&self, entity_id: &str, attribute: AttributeKind) -> Option<&ValidationError> {
        self.errors.get(entity_id)?.get(attribute.name())
    }

    /// Adds a top-level entity and appends it to the root order.
    pub fn add_entity(
        &mut self,
        kind: EntityKind,
        attributes: BTreeMap<String, Value>,
    ) -> Result<String, StructuralError> {
        self.insert_entity(kind, attributes, None)
    }

    /// Adds an entity nested under an existing parent.
    pub fn add_child_entity(
        &mut self,
        kind: EntityKind,
        attributes: BTreeMap<String, Value>,
        parent_id: &str,
    ) -> Result<String, StructuralError> {
        if !self.schema.contains(parent_id) {
            return Err(StructuralError::UnknownEntity(parent_id.to_string()));
        }
        self.insert_entity(kind, attributes, Some(parent_id.to_string()))
    }

    fn insert_entity(
        &mut self,
        kind: EntityKind,
        attributes: BTreeMap<String, Value>,
        parent_id: Option<String>,
    ) -> Result<String, StructuralError> {
        if !self.registry.contains(kind) {
            return Err(StructuralError::UnknownKind(kind.tag().to_string()));
        }
        for name in attributes.keys() {
            ensure_accepted(kind, name)?;
        }

        let id = Uuid::new_v4().to_string();
        let top_level = parent_id.is_none();
        self.schema.entities.insert(
            id.clone(),
            EntityInstance {
                kind,
                attributes,
                parent_id,
            },
        );
        if top_level {
            self.schema.root.push(id.clone());
        }
        Ok(id)
    }

    /// Removes an entity and its whole subtree, keeping the forest intact.
    pub fn delete_entity(&mut self, id: &str) -> Result<BuilderEvent, StructuralError> {
        if !self.schema.contains(id) {
            return Err(StructuralError::UnknownEntity(id.to_string()));
        }

        let mut removed = vec![id.to_string()];
        removed.extend(self.schema.descendants_of(id));
        for gone in &removed {
            self.schema.entities.remove(gone);
            self.errors.remove(gone);
        }
        self.schema.root.retain(|entry| entry != id);

        Ok(BuilderEvent::EntityDeleted {
            id: id.to_string(),
            removed,
        })
    }

    /// Stores a raw attribute value without validating it. A JSON null
    /// unsets the attribute.
    pub fn set_attribute_value(
        &mut self,
        entity_id: &str,
        attribute: &str,
        value: Value,
    ) -> Result<BuilderEvent, StructuralError> {
        let instance = self
            .schema
            .entities
            .get_mut(entity_id)
            .ok_or_else(|| StructuralError::UnknownEntity(entity_id.to_string()))?;
        let attribute = ensure_accepted(instance.kind, attribute)?;

        if value.is_null() {
            instance.attributes.remove(attribute.name());
        } else {
            instance.attributes.insert(attribute.name().to_string(), value);
        }

        Ok(BuilderEvent::AttributeUpdated {
            entity_id: entity_id.to_string(),
            attribute,
        })
    }

    /// Runs one attribute's validator (including the kind's cross-field
    /// extension), refreshes the cache and returns the outcome.
    pub fn validate_entity_attribute(
        &mut self,
        entity_id: &str,
        attribute: &str,
    ) -> Result<AttributeCheck, StructuralError> {
        let instance = self
            .schema
            .get(entity_id)
            .ok_or_else(|| StructuralError::UnknownEntity(entity_id.to_string()))?;
        let attribute = ensure_accepted(instance.kind, attribute)?;

        let outcome = instance
            .kind
            .validate_attribute(attribute, &instance.context());

        match &outcome {
            Ok(()) => {
                if let Some(cached) = self.errors.get_mut(entity_id) {
                    cached.remove(attribute.name());
                    if cached.is_empty() {
                        self.errors.remove(entity_id);
                    }
                }
            }
            Err(error) => {
                self.errors
                    .entry(entity_id.to_string())
                    .or_default()
                    .insert(attribute.name().to_string(), error.clone());
            }
        }

        Ok(AttributeCheck {
            entity_id: entity_id.to_string(),
            attribute,
            error: outcome.err(),
        })
    }

    /// Validates every declared attribute of every entity. Succeeds only
    /// when all pass; the schema itself is never mutated.
    pub fn validate_schema(&mut self) -> SchemaValidation {
        let mut errors = SchemaErrors::new();
        for (id, instance) in &self.schema.entities {
            for attribute in instance.kind.attributes() {
                if let Err(error) = instance
                    .kind
                    .validate_attribute(*attribute, &instance.context())
                {
                    errors
                        .entry(id.clone())
                        .or_default()
                        .insert(attribute.name().to_string(), error);
                }
            }
        }

        self.errors = errors.clone();
        if errors.is_empty() {
            SchemaValidation::Valid(self.schema.clone())
        } else {
            SchemaValidation::Invalid(errors)
        }
    }
}

fn ensure_accepted(kind: EntityKind, attribute: &str) -> Result<AttributeKind, StructuralError> {
    AttributeKind::from_name(attribute)
        .filter(|candidate| kind.accepts(*candidate))
        .ok_or_else(|| StructuralError::UnknownAttribute {
            kind: kind.tag().to_string(),
            attribute: attribute.to_string(),
        })
}
