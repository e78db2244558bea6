use serde_json::{Map, Value, json};

use crate::entity::EntityKind;
use crate::interpreter::InterpreterStore;

/// One field as a renderer sees it.
#[derive(Debug, Clone)]
pub struct RenderField {
    pub id: String,
    pub kind: EntityKind,
    pub label: String,
    pub required: bool,
    /// Effective value: the respondent's answer or the kind default.
    pub value: Option<Value>,
    pub error: Option<String>,
}

/// Snapshot of a fill session for text and JSON renderers.
#[derive(Debug, Clone)]
pub struct RenderPayload {
    pub fields: Vec<RenderField>,
    /// Fields the respondent answered explicitly (defaults don't count).
    pub answered: usize,
    pub total: usize,
}

/// Collects the render payload in display order.
pub fn build_render_payload(store: &InterpreterStore) -> RenderPayload {
    let schema = store.schema();
    let order = schema.display_order();

    let fields = order
        .iter()
        .filter_map(|id| {
            let instance = schema.get(id)?;
            Some(RenderField {
                id: id.clone(),
                kind: instance.kind,
                label: instance
                    .label()
                    .unwrap_or(instance.kind.display_name())
                    .to_string(),
                required: instance.context().required(),
                value: store.effective_value(id),
                error: store.entity_error(id).map(|error| error.message.clone()),
            })
        })
        .collect::<Vec<_>>();

    let answered = fields
        .iter()
        .filter(|field| store.answer(&field.id).is_some())
        .count();
    let total = fields.len();

    RenderPayload {
        fields,
        answered,
        total,
    }
}

/// Renders the payload as human-friendly text.
pub fn render_text(payload: &RenderPayload) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "Answered: {}/{}",
        payload.answered, payload.total
    ));
    for field in &payload.fields {
        let mut entry = format!(" - {} [{}]", field.label, field.kind.display_name());
        if field.required {
            entry.push_str(" *");
        }
        if let Some(value) = &field.value {
            entry.push_str(&format!(" = {}", value_to_display(value)));
        }
        lines.push(entry);
        if let Some(error) = &field.error {
            lines.push(format!("   ! {error}"));
        }
    }
    lines.join("\n")
}

/// Renders the payload as a structured JSON-friendly value.
pub fn render_json(payload: &RenderPayload) -> Value {
    let fields = payload
        .fields
        .iter()
        .map(|field| {
            let mut map = Map::new();
            map.insert("id".into(), Value::String(field.id.clone()));
            map.insert("type".into(), Value::String(field.kind.tag().to_string()));
            map.insert("label".into(), Value::String(field.label.clone()));
            map.insert("required".into(), Value::Bool(field.required));
            if let Some(value) = &field.value {
                map.insert("value".into(), value.clone());
            }
            if let Some(error) = &field.error {
                map.insert("error".into(), Value::String(error.clone()));
            }
            Value::Object(map)
        })
        .collect::<Vec<_>>();

    json!({
        "progress": {
            "answered": payload.answered,
            "total": payload.total,
        },
        "fields": fields,
    })
}

fn value_to_display(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(num) => num.to_string(),
        other => other.to_string(),
    }
}
