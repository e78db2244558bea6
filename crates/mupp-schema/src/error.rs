use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A value or attribute failed its constraint.
///
/// Always scoped to one field; stores hand it back as data and never let it
/// escape as an `Err` past their validation entry points.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize, JsonSchema)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: Some(code.into()),
        }
    }
}

/// An operation referenced something the schema does not contain.
///
/// These are programmer or data errors, not user input problems: they fail
/// the operation immediately instead of landing in an error map.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    #[error("entity '{0}' does not exist in the schema")]
    UnknownEntity(String),
    #[error("entity kind '{0}' is not registered")]
    UnknownKind(String),
    #[error("attribute '{attribute}' is not accepted by entity kind '{kind}'")]
    UnknownAttribute { kind: String, attribute: String },
    #[error("entity '{entity}' references missing parent '{parent}'")]
    DanglingParent { entity: String, parent: String },
    #[error("root entry '{0}' does not exist in the schema")]
    DanglingRoot(String),
    #[error("root entry '{0}' is listed more than once")]
    DuplicateRoot(String),
    #[error("parent chain of entity '{0}' forms a cycle")]
    ParentCycle(String),
}
