use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::{StructuralError, ValidationError};
use crate::registry::Registry;
use crate::schema::Schema;

/// What an interpreter mutation changed; mirrors [`crate::builder::BuilderEvent`]
/// so callers can drive re-validation explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterpreterEvent {
    ValueUpdated { entity_id: String },
    ValueCleared { entity_id: String },
}

/// Outcome of validating one entity's answer, returned as data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityCheck {
    pub entity_id: String,
    pub error: Option<ValidationError>,
}

impl EntityCheck {
    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }
}

/// Result of validating every answer in the form.
#[derive(Debug, Clone, PartialEq)]
pub enum AnswersValidation {
    /// Every entity passed; the map carries the effective answer per entity
    /// (defaults included) and is ready to submit.
    Valid(BTreeMap<String, Value>),
    Invalid(BTreeMap<String, ValidationError>),
}

impl AnswersValidation {
    pub fn is_valid(&self) -> bool {
        matches!(self, AnswersValidation::Valid(_))
    }

    pub fn into_answers(self) -> Option<BTreeMap<String, Value>> {
        match self {
            AnswersValidation::Valid(answers) => Some(answers),
            AnswersValidation::Invalid(_) => None,
        }
    }

    pub fn errors(&self) -> Option<&BTreeMap<String, ValidationError>> {
        match self {
            AnswersValidation::Valid(_) => None,
            AnswersValidation::Invalid(errors) => Some(errors),
        }
    }
}

/// Read/fill session over a fixed schema.
///
/// The schema is immutable for the lifetime of the store; only the parallel
/// answer map changes. Attribute values are read straight from the schema,
/// so a field's validation policy cannot drift while respondents type.
#[derive(Debug, Clone)]
pub struct InterpreterStore {
    schema: Schema,
    answers: BTreeMap<String, Value>,
    errors: BTreeMap<String, ValidationError>,
}

impl InterpreterStore {
    /// Builds a fill session, failing fast when the schema breaks the
    /// reference/forest invariants or uses a kind outside the registry.
    pub fn new(registry: &Registry, schema: Schema) -> Result<Self, StructuralError> {
        schema.ensure_well_formed()?;
        for instance in schema.entities.values() {
            if !registry.contains(instance.kind) {
                return Err(StructuralError::UnknownKind(instance.kind.tag().to_string()));
            }
        }
        Ok(Self {
            schema,
            answers: BTreeMap::new(),
            errors: BTreeMap::new(),
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The raw answer the respondent entered, if any.
    pub fn answer(&self, entity_id: &str) -> Option<&Value> {
        self.answers.get(entity_id)
    }

    /// Cached validation error for one entity, if the last check failed.
    pub fn entity_error(&self, entity_id: &str) -> Option<&ValidationError> {
        self.errors.get(entity_id)
    }

    /// The value a field shows and is judged by: the stored answer, or the
    /// kind's default until the respondent overrides it.
    pub fn effective_value(&self, entity_id: &str) -> Option<Value> {
        let instance = self.schema.get(entity_id)?;
        match self.answers.get(entity_id) {
            Some(answer) => Some(answer.clone()),
            None => instance.kind.default_value(&instance.context()),
        }
    }

    /// Stores a raw answer without validating it. A JSON null clears the
    /// answer, reverting the field to its default.
    pub fn set_entity_value(
        &mut self,
        entity_id: &str,
        value: Value,
    ) -> Result<InterpreterEvent, StructuralError> {
        if !self.schema.contains(entity_id) {
            return Err(StructuralError::UnknownEntity(entity_id.to_string()));
        }
        if value.is_null() {
            self.answers.remove(entity_id);
            Ok(InterpreterEvent::ValueCleared {
                entity_id: entity_id.to_string(),
            })
        } else {
            self.answers.insert(entity_id.to_string(), value);
            Ok(InterpreterEvent::ValueUpdated {
                entity_id: entity_id.to_string(),
            })
        }
    }

    /// Clears an answer so the field falls back to its default.
    pub fn clear_entity_value(
        &mut self,
        entity_id: &str,
    ) -> Result<InterpreterEvent, StructuralError> {
        self.set_entity_value(entity_id, Value::Null)
    }

    /// Validates one entity's effective value against its kind's policy,
    /// refreshing the cache.
    pub fn validate_entity_value(
        &mut self,
        entity_id: &str,
    ) -> Result<EntityCheck, StructuralError> {
        let instance = self
            .schema
            .get(entity_id)
            .ok_or_else(|| StructuralError::UnknownEntity(entity_id.to_string()))?;

        let effective = self.effective_value(entity_id);
        let outcome = instance
            .kind
            .validate_value(effective.as_ref(), &instance.context());

        match &outcome {
            Ok(()) => {
                self.errors.remove(entity_id);
            }
            Err(error) => {
                self.errors.insert(entity_id.to_string(), error.clone());
            }
        }

        Ok(EntityCheck {
            entity_id: entity_id.to_string(),
            error: outcome.err(),
        })
    }

    /// Validates every entity in the schema. On success returns the
    /// id -> effective-answer map ready for submission; entities without a
    /// value (an unanswered optional text field) are omitted.
    pub fn validate_entities_values(&mut self) -> AnswersValidation {
        let mut errors = BTreeMap::new();
        let mut answers = BTreeMap::new();

        for (id, instance) in &self.schema.entities {
            let effective = match self.answers.get(id) {
                Some(answer) => Some(answer.clone()),
                None => instance.kind.default_value(&instance.context()),
            };
            match instance
                .kind
                .validate_value(effective.as_ref(), &instance.context())
            {
                Ok(()) => {
                    if let Some(value) = effective.filter(|value| !value.is_null()) {
                        answers.insert(id.clone(), value);
                    }
                }
                Err(error) => {
                    errors.insert(id.clone(), error);
                }
            }
        }

        self.errors = errors.clone();
        if errors.is_empty() {
            AnswersValidation::Valid(answers)
        } else {
            AnswersValidation::Invalid(errors)
        }
    }
}
