#![allow(missing_docs)]

pub mod attribute;
pub mod builder;
pub mod entity;
pub mod error;
pub mod interpreter;
pub mod registry;
pub mod render;
pub mod schema;

pub use attribute::AttributeKind;
pub use builder::{
    AttributeCheck, BuilderEvent, BuilderStore, SchemaErrors, SchemaValidation,
};
pub use entity::{
    AttributeContext, EntityKind, MIN_BELOW_MAX_MESSAGE, SCALE_MAX_FALLBACK, SCALE_MIN_FALLBACK,
};
pub use error::{StructuralError, ValidationError};
pub use interpreter::{AnswersValidation, EntityCheck, InterpreterEvent, InterpreterStore};
pub use registry::Registry;
pub use render::{RenderField, RenderPayload, build_render_payload, render_json, render_text};
pub use schema::{EntityInstance, Schema};
