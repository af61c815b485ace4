//! Field decoders for request bodies sent by browsers and other clients
//!
//! Each decoder accepts any JSON value and falls back to the field's default
//! when the value is missing, `null` or of the wrong shape, so one bad field
//! never rejects a whole request.

use super::{catalog, ChatRole, ProjectParams};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::str::FromStr;

/// Any deserializable value, or `T::default()`
pub(crate) fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Array entries that decode; anything else is dropped
pub(crate) fn list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let entries = match Value::deserialize(deserializer)? {
        Value::Array(entries) => entries,
        _ => return Ok(Vec::new()),
    };
    Ok(entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value(entry).ok())
        .collect())
}

/// An option label in any spelling `FromStr` accepts ("high", "living-room")
pub(crate) fn label<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value
        .as_str()
        .and_then(|s| s.parse().ok())
        .unwrap_or_default())
}

/// Style name; blank or non-string values mean the default style
pub(crate) fn style<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(catalog::default_style))
}

/// Positive area as a number or as text ("30 m2"); `null` and NaN give the default
pub(crate) fn area<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let area = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64().filter(|a| a.is_finite() && *a > 0.0),
        Value::String(s) => ProjectParams::parse_area(&s).ok(),
        _ => None,
    };
    Ok(area.unwrap_or_else(|| ProjectParams::default().area))
}

/// Palette tags; a non-array value means the default palette
pub(crate) fn colors<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Array(entries) => Ok(entries
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()),
        _ => Ok(ProjectParams::default().colors),
    }
}

/// `assistant` in any case is the assistant; every other role is the user
pub(crate) fn chat_role<'de, D>(deserializer: D) -> Result<ChatRole, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value.as_str() {
        Some(role) if role.trim().eq_ignore_ascii_case("assistant") => ChatRole::Assistant,
        _ => ChatRole::User,
    })
}
