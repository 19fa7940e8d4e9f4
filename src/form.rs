//! Helpers shared by the request body validators.
//!
//! Request bodies are deserialized into structs of optional [serde_json::Value]s
//! so that every problem with a body can be reported against the field it
//! belongs to, rather than failing on the first bad field.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::{error::FieldErrors, money::Amount};

/// The message for a required field that was not given.
pub const REQUIRED: &str = "This field is required.";
/// The message for a field that was explicitly set to `null`.
pub const NOT_NULL: &str = "This field may not be null.";

/// Deserialize a field that was given in the body, keeping an explicit `null` as `Some(Value::Null)`.
///
/// Use with `#[serde(default, deserialize_with = "crate::form::present")]` so
/// that an absent field is `None` and a `null` field can be told apart from it.
pub fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Record [REQUIRED] against `field` if `value` is `None`.
pub fn required<T>(value: Option<T>, field: &str, errors: &mut FieldErrors) -> Option<T> {
    if value.is_none() {
        errors.add(field, REQUIRED);
    }

    value
}

/// Parse a JSON amount for `field`, recording a message in `errors` if it is invalid.
pub fn parse_amount(value: &Value, field: &str, errors: &mut FieldErrors) -> Option<Amount> {
    if value.is_null() {
        errors.add(field, NOT_NULL);
        return None;
    }

    Amount::from_json(value)
        .map_err(|error| errors.add(field, error.to_string()))
        .ok()
}

/// Read a JSON string for `field`, trimmed of surrounding whitespace.
///
/// Records a message in `errors` and returns `None` for `null` and non-string values.
pub fn parse_string(value: &Value, field: &str, errors: &mut FieldErrors) -> Option<String> {
    match value {
        Value::String(text) => Some(text.trim().to_owned()),
        Value::Null => {
            errors.add(field, NOT_NULL);
            None
        }
        _ => {
            errors.add(field, "Not a valid string.");
            None
        }
    }
}
