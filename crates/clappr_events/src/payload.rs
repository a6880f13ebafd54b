//! Helpers for building and reading event payloads

use crate::bus::UserInfo;
use crate::error::EventError;
use serde_json::Value;

/// Turn a JSON object into a payload. Anything that is not an object yields an empty payload.
pub fn user_info(value: Value) -> UserInfo {
    match value {
        Value::Object(map) => map,
        _ => UserInfo::new(),
    }
}

/// Read a numeric field
pub fn number(info: Option<&UserInfo>, key: &str) -> Result<f64, EventError> {
    let value = info
        .and_then(|info| info.get(key))
        .ok_or_else(|| EventError::MissingField(key.to_string()))?;
    value.as_f64().ok_or_else(|| EventError::InvalidField {
        field: key.to_string(),
        expected: "number",
    })
}

/// Read a string field
pub fn string<'a>(info: Option<&'a UserInfo>, key: &str) -> Result<&'a str, EventError> {
    let value = info
        .and_then(|info| info.get(key))
        .ok_or_else(|| EventError::MissingField(key.to_string()))?;
    value.as_str().ok_or_else(|| EventError::InvalidField {
        field: key.to_string(),
        expected: "string",
    })
}
