use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;

/// The closed set of attributes an entity instance can carry.
///
/// Attributes are atomic and reusable across entity kinds; each one owns a
/// pure validation rule over its raw JSON value. Which attributes a given
/// entity accepts is declared by [`crate::entity::EntityKind::attributes`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "camelCase")]
pub enum AttributeKind {
    Label,
    Required,
    Min,
    Max,
    Weight,
    DefaultValue,
}

impl AttributeKind {
    /// Wire name of the attribute, as used in schema `attributes` maps.
    pub const fn name(self) -> &'static str {
        match self {
            AttributeKind::Label => "label",
            AttributeKind::Required => "required",
            AttributeKind::Min => "min",
            AttributeKind::Max => "max",
            AttributeKind::Weight => "weight",
            AttributeKind::DefaultValue => "defaultValue",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "label" => Some(AttributeKind::Label),
            "required" => Some(AttributeKind::Required),
            "min" => Some(AttributeKind::Min),
            "max" => Some(AttributeKind::Max),
            "weight" => Some(AttributeKind::Weight),
            "defaultValue" => Some(AttributeKind::DefaultValue),
            _ => None,
        }
    }

    /// Validates a raw value against this attribute's own constraint.
    ///
    /// `None` means the attribute is unset on the instance; optional
    /// attributes accept that, mandatory ones reject it. Kind-specific
    /// policies on top of this (the min/max cross check) live on the entity
    /// side, so the dependency direction stays entity -> attribute.
    pub fn validate(self, value: Option<&Value>) -> Result<(), ValidationError> {
        let value = value.filter(|value| !value.is_null());
        match self {
            AttributeKind::Label => match value {
                Some(Value::String(text)) if !text.trim().is_empty() => Ok(()),
                Some(Value::String(_)) | None => Err(ValidationError::with_code(
                    "label must not be empty",
                    "required",
                )),
                Some(_) => Err(ValidationError::with_code(
                    "label must be text",
                    "type_mismatch",
                )),
            },
            AttributeKind::Required => match value {
                None | Some(Value::Bool(_)) => Ok(()),
                Some(_) => Err(ValidationError::with_code(
                    "required flag must be true or false",
                    "type_mismatch",
                )),
            },
            AttributeKind::Min => check_bound(value, "minimum"),
            AttributeKind::Max => check_bound(value, "maximum"),
            AttributeKind::Weight => match value {
                None => Ok(()),
                Some(raw) => match raw.as_i64() {
                    Some(weight) if (1..=5).contains(&weight) => Ok(()),
                    Some(_) => Err(ValidationError::with_code(
                        "weight must be between 1 and 5",
                        "range",
                    )),
                    None => Err(ValidationError::with_code(
                        "weight must be a whole number",
                        "type_mismatch",
                    )),
                },
            },
            // Shape depends on the owning entity kind; anything goes here.
            AttributeKind::DefaultValue => Ok(()),
        }
    }
}

fn check_bound(value: Option<&Value>, which: &str) -> Result<(), ValidationError> {
    match value {
        None => Ok(()),
        Some(raw) => match raw.as_i64() {
            Some(bound) if bound >= 0 => Ok(()),
            Some(_) => Err(ValidationError::with_code(
                format!("{which} value must not be negative"),
                "nonnegative",
            )),
            None => Err(ValidationError::with_code(
                format!("{which} value must be a whole number"),
                "type_mismatch",
            )),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn label_rejects_empty_and_missing() {
        assert!(AttributeKind::Label.validate(Some(&json!("Name"))).is_ok());
        assert!(AttributeKind::Label.validate(Some(&json!(""))).is_err());
        assert!(AttributeKind::Label.validate(Some(&json!("   "))).is_err());
        assert!(AttributeKind::Label.validate(None).is_err());
        assert!(AttributeKind::Label.validate(Some(&json!(3))).is_err());
    }

    #[test]
    fn required_flag_is_optional_boolean() {
        assert!(AttributeKind::Required.validate(None).is_ok());
        assert!(AttributeKind::Required.validate(Some(&json!(true))).is_ok());
        assert!(
            AttributeKind::Required
                .validate(Some(&json!("yes")))
                .is_err()
        );
    }

    #[test]
    fn bounds_must_be_non_negative_integers() {
        assert!(AttributeKind::Min.validate(Some(&json!(0))).is_ok());
        assert!(AttributeKind::Max.validate(Some(&json!(10))).is_ok());
        assert!(AttributeKind::Min.validate(Some(&json!(-1))).is_err());
        assert!(AttributeKind::Max.validate(Some(&json!(2.5))).is_err());
        assert!(AttributeKind::Min.validate(None).is_ok());
    }

    #[test]
    fn weight_stays_in_one_to_five() {
        assert!(AttributeKind::Weight.validate(Some(&json!(1))).is_ok());
        assert!(AttributeKind::Weight.validate(Some(&json!(5))).is_ok());
        assert!(AttributeKind::Weight.validate(Some(&json!(0))).is_err());
        assert!(AttributeKind::Weight.validate(Some(&json!(6))).is_err());
    }

    #[test]
    fn wire_names_round_trip() {
        for kind in [
            AttributeKind::Label,
            AttributeKind::Required,
            AttributeKind::Min,
            AttributeKind::Max,
            AttributeKind::Weight,
            AttributeKind::DefaultValue,
        ] {
            assert_eq!(AttributeKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(AttributeKind::from_name("bogus"), None);
    }
}
