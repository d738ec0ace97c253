//! Lenient projections from loosely-typed JSON onto canonical field types.
//!
//! Models drift between strings and numbers, scalars and lists, and emit
//! `null` wherever they feel like it. Every function here accepts any JSON
//! value and returns the canonical type, never failing.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;

static RE_INTEGER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-?\d+").unwrap());

/// Deserializes a nested section, treating anything but an object as absent.
pub fn section<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_object() {
        T::deserialize(value).map_err(serde::de::Error::custom)
    } else {
        Ok(T::default())
    }
}

/// Plain text. Lists are comma-joined, objects contribute their `name`.
pub fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items
            .iter()
            .map(text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(map) => map.get("name").map(text).unwrap_or_default(),
        Value::Null => String::new(),
    }
}

/// First non-empty entry of a list, or the value itself as text.
pub fn first_text(value: &Value) -> String {
    match value {
        Value::Array(items) => items
            .iter()
            .map(text)
            .find(|s| !s.is_empty())
            .unwrap_or_default(),
        other => text(other),
    }
}

/// Integer. Strings contribute their first integer ("3 rounds" → 3,
/// "120,000" → 120000). Anything unreadable is 0.
pub fn int(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64))
            .unwrap_or(0),
        Value::String(s) => {
            let compact = s.replace(',', "");
            RE_INTEGER
                .find(&compact)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(0)
        }
        Value::Bool(_) | Value::Array(_) | Value::Object(_) | Value::Null => 0,
    }
}

/// Boolean. Accepts `true`, non-zero numbers and "true"/"yes"/"y"/"1".
pub fn flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "yes" | "y" | "1"
        ),
        Value::Array(_) | Value::Object(_) | Value::Null => false,
    }
}

/// List of non-empty strings. A lone scalar becomes a one-element list.
pub fn list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(text)
            .filter(|s| !s.is_empty())
            .collect(),
        Value::Null => Vec::new(),
        other => {
            let s = text(other);
            if s.is_empty() {
                Vec::new()
            } else {
                vec![s]
            }
        }
    }
}

/// Skill names with duplicates removed, first occurrence kept.
///
/// Structured entries (`{"name", "level", "description"}`) are projected
/// down to their name.
pub fn names(value: &Value) -> Vec<String> {
    dedup(list(value))
}

/// Removes exact duplicates while keeping order.
pub fn dedup(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}
