use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::attribute::AttributeKind;
use crate::error::ValidationError;

/// Lower bound used when a number scale has no `min` attribute.
pub const SCALE_MIN_FALLBACK: i64 = 1;
/// Upper bound used when a number scale has no `max` attribute.
pub const SCALE_MAX_FALLBACK: i64 = 10;

/// Error raised when a number scale's minimum crosses its maximum.
pub const MIN_BELOW_MAX_MESSAGE: &str = "Minimum value must be less than maximum value.";

/// The closed set of field kinds a form can be composed of.
///
/// Kinds are enumerable, so per-kind behaviour is a match on this tag rather
/// than a trait object: each kind declares the attributes it accepts, how to
/// judge an answer value given those attributes, and (for some kinds) how to
/// compute a default answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind {
    TextField,
    NumberScale,
    Boolean,
    IsLeader,
}

impl EntityKind {
    /// Wire tag, as stored in the schema's `type` field.
    pub const fn tag(self) -> &'static str {
        match self {
            EntityKind::TextField => "textField",
            EntityKind::NumberScale => "numberScale",
            EntityKind::Boolean => "boolean",
            EntityKind::IsLeader => "isLeader",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "textField" => Some(EntityKind::TextField),
            "numberScale" => Some(EntityKind::NumberScale),
            "boolean" => Some(EntityKind::Boolean),
            "isLeader" => Some(EntityKind::IsLeader),
            _ => None,
        }
    }

    /// Human-friendly name used by renderers and prompts.
    pub const fn display_name(self) -> &'static str {
        match self {
            EntityKind::TextField => "Text Field",
            EntityKind::NumberScale => "Number Scale",
            EntityKind::Boolean => "Checkbox",
            EntityKind::IsLeader => "Leader Marker",
        }
    }

    /// The attributes this kind accepts, in presentation order.
    pub const fn attributes(self) -> &'static [AttributeKind] {
        match self {
            EntityKind::TextField | EntityKind::Boolean => &[
                AttributeKind::Label,
                AttributeKind::Required,
                AttributeKind::DefaultValue,
            ],
            EntityKind::NumberScale => &[
                AttributeKind::Label,
                AttributeKind::Weight,
                AttributeKind::Min,
                AttributeKind::Max,
                AttributeKind::DefaultValue,
            ],
            EntityKind::IsLeader => &[AttributeKind::Label, AttributeKind::DefaultValue],
        }
    }

    pub fn accepts(self, attribute: AttributeKind) -> bool {
        self.attributes().contains(&attribute)
    }

    /// Validates one attribute value in the context of its siblings.
    ///
    /// Runs the attribute's own rule first, then any kind-specific extension.
    /// The one genuine cross-field invariant in the system lives here: a
    /// number scale's `min` must stay below its current `max`, so this check
    /// must be re-run whenever either bound changes.
    pub fn validate_attribute(
        self,
        attribute: AttributeKind,
        ctx: &AttributeContext<'_>,
    ) -> Result<(), ValidationError> {
        attribute.validate(ctx.get(attribute))?;

        if self == EntityKind::NumberScale
            && attribute == AttributeKind::Min
            && let Some(min) = ctx.get(AttributeKind::Min).and_then(Value::as_i64)
            && min >= ctx.max()
        {
            return Err(ValidationError::with_code(MIN_BELOW_MAX_MESSAGE, "min_max"));
        }

        Ok(())
    }

    /// Judges an answer value against this kind's policy.
    ///
    /// `None` (or JSON null) means the respondent has not answered.
    pub fn validate_value(
        self,
        value: Option<&Value>,
        ctx: &AttributeContext<'_>,
    ) -> Result<(), ValidationError> {
        let value = value.filter(|value| !value.is_null());
        match self {
            EntityKind::TextField => match value {
                Some(Value::String(text)) => {
                    if ctx.required() && text.is_empty() {
                        Err(ValidationError::with_code("an answer is required", "required"))
                    } else {
                        Ok(())
                    }
                }
                Some(_) => Err(ValidationError::with_code(
                    "answer must be text",
                    "type_mismatch",
                )),
                None => {
                    if ctx.required() {
                        Err(ValidationError::with_code("an answer is required", "required"))
                    } else {
                        Ok(())
                    }
                }
            },
            EntityKind::NumberScale => {
                let raw = value.ok_or_else(|| {
                    ValidationError::with_code("an answer is required", "required")
                })?;
                let answer = raw.as_i64().ok_or_else(|| {
                    ValidationError::with_code("answer must be a whole number", "type_mismatch")
                })?;
                if answer < 0 {
                    return Err(ValidationError::with_code(
                        "answer must not be negative",
                        "nonnegative",
                    ));
                }
                let (min, max) = (ctx.min(), ctx.max());
                if answer < min || answer > max {
                    return Err(ValidationError::with_code(
                        format!("answer must be between {min} and {max}"),
                        "range",
                    ));
                }
                Ok(())
            }
            EntityKind::Boolean => match value {
                Some(Value::Bool(_)) => Ok(()),
                Some(_) => Err(ValidationError::with_code(
                    "answer must be true or false",
                    "type_mismatch",
                )),
                None => {
                    if ctx.required() {
                        Err(ValidationError::with_code("an answer is required", "required"))
                    } else {
                        Ok(())
                    }
                }
            },
            // Marker field: any boolean, never mandatory.
            EntityKind::IsLeader => match value {
                None | Some(Value::Bool(_)) => Ok(()),
                Some(_) => Err(ValidationError::with_code(
                    "answer must be true or false",
                    "type_mismatch",
                )),
            },
        }
    }

    /// Default answer supplied while the respondent has not overridden it.
    pub fn default_value(self, ctx: &AttributeContext<'_>) -> Option<Value> {
        match self {
            EntityKind::TextField => None,
            EntityKind::NumberScale => ctx
                .get(AttributeKind::DefaultValue)
                .cloned()
                .or_else(|| {
                    let (min, max) = (ctx.min(), ctx.max());
                    Some(Value::from((max - min) / 2 + min))
                }),
            EntityKind::Boolean | EntityKind::IsLeader => Some(
                ctx.get(AttributeKind::DefaultValue)
                    .cloned()
                    .unwrap_or(Value::Bool(false)),
            ),
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Read view over an instance's resolved attribute values.
///
/// Validation and defaulting are parameterized by this, never by the store
/// that owns the instance.
#[derive(Debug, Clone, Copy)]
pub struct AttributeContext<'a> {
    attributes: &'a BTreeMap<String, Value>,
}

impl<'a> AttributeContext<'a> {
    pub fn new(attributes: &'a BTreeMap<String, Value>) -> Self {
        Self { attributes }
    }

    pub fn get(&self, attribute: AttributeKind) -> Option<&'a Value> {
        self.attributes
            .get(attribute.name())
            .filter(|value| !value.is_null())
    }

    /// Whether the instance's `required` attribute is set to true.
    pub fn required(&self) -> bool {
        self.get(AttributeKind::Required)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Lower bound of a number scale, falling back to 1 when unset.
    pub fn min(&self) -> i64 {
        self.get(AttributeKind::Min)
            .and_then(Value::as_i64)
            .unwrap_or(SCALE_MIN_FALLBACK)
    }

    /// Upper bound of a number scale, falling back to 10 when unset.
    pub fn max(&self) -> i64 {
        self.get(AttributeKind::Max)
            .and_then(Value::as_i64)
            .unwrap_or(SCALE_MAX_FALLBACK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx_of(attrs: &BTreeMap<String, Value>) -> AttributeContext<'_> {
        AttributeContext::new(attrs)
    }

    fn attrs(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn kind_tags_round_trip() {
        for kind in [
            EntityKind::TextField,
            EntityKind::NumberScale,
            EntityKind::Boolean,
            EntityKind::IsLeader,
        ] {
            assert_eq!(EntityKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(EntityKind::from_tag("dropdown"), None);
    }

    #[test]
    fn kind_tags_match_serde_names() {
        let tag = serde_json::to_value(EntityKind::NumberScale).unwrap();
        assert_eq!(tag, json!("numberScale"));
        let parsed: EntityKind = serde_json::from_value(json!("isLeader")).unwrap();
        assert_eq!(parsed, EntityKind::IsLeader);
    }

    #[test]
    fn min_attribute_rejects_crossing_max() {
        let crossing = attrs(&[("min", json!(10)), ("max", json!(10))]);
        let err = EntityKind::NumberScale
            .validate_attribute(AttributeKind::Min, &ctx_of(&crossing))
            .unwrap_err();
        assert_eq!(err.message, MIN_BELOW_MAX_MESSAGE);

        let ordered = attrs(&[("min", json!(3)), ("max", json!(10))]);
        assert!(
            EntityKind::NumberScale
                .validate_attribute(AttributeKind::Min, &ctx_of(&ordered))
                .is_ok()
        );
    }

    #[test]
    fn min_check_uses_fallback_max() {
        // No max attribute: the 10 fallback still bounds min.
        let attrs = attrs(&[("min", json!(12))]);
        let err = EntityKind::NumberScale
            .validate_attribute(AttributeKind::Min, &ctx_of(&attrs))
            .unwrap_err();
        assert_eq!(err.message, MIN_BELOW_MAX_MESSAGE);
    }

    #[test]
    fn scale_default_is_midpoint() {
        let attrs = attrs(&[("min", json!(1)), ("max", json!(10))]);
        assert_eq!(
            EntityKind::NumberScale.default_value(&ctx_of(&attrs)),
            Some(json!(5))
        );

        // Unset bounds fall back to [1, 10], so the midpoint is still 5.
        let empty = BTreeMap::new();
        assert_eq!(
            EntityKind::NumberScale.default_value(&ctx_of(&empty)),
            Some(json!(5))
        );
    }

    #[test]
    fn scale_default_prefers_explicit_attribute() {
        let attrs = attrs(&[("min", json!(1)), ("max", json!(10)), ("defaultValue", json!(7))]);
        assert_eq!(
            EntityKind::NumberScale.default_value(&ctx_of(&attrs)),
            Some(json!(7))
        );
    }

    #[test]
    fn boolean_defaults_to_false() {
        let empty = BTreeMap::new();
        assert_eq!(
            EntityKind::Boolean.default_value(&ctx_of(&empty)),
            Some(json!(false))
        );
        assert_eq!(
            EntityKind::IsLeader.default_value(&ctx_of(&empty)),
            Some(json!(false))
        );
        assert_eq!(EntityKind::TextField.default_value(&ctx_of(&empty)), None);
    }

    #[test]
    fn text_field_required_semantics() {
        let required = attrs(&[("required", json!(true))]);
        let optional = BTreeMap::new();

        assert!(
            EntityKind::TextField
                .validate_value(None, &ctx_of(&required))
                .is_err()
        );
        assert!(
            EntityKind::TextField
                .validate_value(Some(&json!("")), &ctx_of(&required))
                .is_err()
        );
        assert!(
            EntityKind::TextField
                .validate_value(Some(&json!("x")), &ctx_of(&required))
                .is_ok()
        );
        assert!(
            EntityKind::TextField
                .validate_value(None, &ctx_of(&optional))
                .is_ok()
        );
    }

    #[test]
    fn boolean_required_accepts_false() {
        let required = attrs(&[("required", json!(true))]);
        assert!(
            EntityKind::Boolean
                .validate_value(Some(&json!(false)), &ctx_of(&required))
                .is_ok()
        );
        assert!(
            EntityKind::Boolean
                .validate_value(None, &ctx_of(&required))
                .is_err()
        );
    }

    #[test]
    fn scale_bounds_are_inclusive() {
        let attrs = attrs(&[("min", json!(2)), ("max", json!(4))]);
        let ctx = ctx_of(&attrs);
        assert!(EntityKind::NumberScale.validate_value(Some(&json!(2)), &ctx).is_ok());
        assert!(EntityKind::NumberScale.validate_value(Some(&json!(4)), &ctx).is_ok());
        assert!(EntityKind::NumberScale.validate_value(Some(&json!(1)), &ctx).is_err());
        assert!(EntityKind::NumberScale.validate_value(Some(&json!(5)), &ctx).is_err());
        assert!(EntityKind::NumberScale.validate_value(Some(&json!(2.5)), &ctx).is_err());
    }
}
