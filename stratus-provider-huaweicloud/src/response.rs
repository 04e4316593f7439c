//! Helpers for request bodies and JSON responses

use std::collections::HashMap;

use serde::{Deserialize, Deserializer};
use serde_json::json;
use stratus_core::resource::Value;

use crate::client::{ClientError, ClientResult};

/// Decode a response body; an empty body becomes `null`
pub fn flatten_response(url: &str, body: &str) -> ClientResult<serde_json::Value> {
    if body.trim().is_empty() {
        return Ok(serde_json::Value::Null);
    }
    serde_json::from_str(body).map_err(|source| ClientError::Decode {
        url: url.to_string(),
        source,
    })
}

/// Deserialize a field that the API may send as `null`, using the default instead
///
/// Use with `#[serde(default, deserialize_with = "null_as_default")]`.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Look up a dotted path such as `ip_list[0].ip` in a JSON document
///
/// Returns `None` when any segment is missing or the value found is `null`.
pub fn path_search<'a>(path: &str, value: &'a serde_json::Value) -> Option<&'a serde_json::Value> {
    let mut current = value;
    for segment in path.split('.') {
        let (key, indexes) = split_indexes(segment)?;
        if !key.is_empty() {
            current = current.get(key)?;
        }
        for index in indexes {
            current = current.get(index)?;
        }
    }
    (!current.is_null()).then_some(current)
}

/// Split `items[1][0]` into `("items", [1, 0])`
fn split_indexes(segment: &str) -> Option<(&str, Vec<usize>)> {
    let Some(open) = segment.find('[') else {
        return Some((segment, Vec::new()));
    };
    let key = &segment[..open];
    let mut indexes = Vec::new();
    for part in segment[open..].split_terminator(']') {
        let index = part.strip_prefix('[')?.parse().ok()?;
        indexes.push(index);
    }
    Some((key, indexes))
}

/// String at `path`, or a [`ClientError::MissingField`] naming it
pub fn require_str(path: &str, value: &serde_json::Value, url: &str) -> ClientResult<String> {
    path_search(path, value)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ClientError::MissingField {
            field: path.to_string(),
            url: url.to_string(),
        })
}

/// Drop `null` members from objects, recursively
pub fn remove_nil(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, remove_nil(v)))
                .collect(),
        ),
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.into_iter().map(remove_nil).collect())
        }
        other => other,
    }
}

/// Turn zero values into `null` so that [`remove_nil`] leaves them out
pub fn value_ignore_empty(value: serde_json::Value) -> serde_json::Value {
    let empty = match &value {
        serde_json::Value::String(s) => s.is_empty(),
        serde_json::Value::Bool(b) => !b,
        serde_json::Value::Number(n) => n.as_f64() == Some(0.0),
        serde_json::Value::Array(items) => items.is_empty(),
        serde_json::Value::Object(map) => map.is_empty(),
        serde_json::Value::Null => true,
    };
    if empty {
        serde_json::Value::Null
    } else {
        value
    }
}

/// Optional string attribute as a JSON request field
pub fn optional_str(attributes: &HashMap<String, Value>, key: &str) -> serde_json::Value {
    match attributes.get(key) {
        Some(Value::String(s)) => value_ignore_empty(json!(s)),
        _ => serde_json::Value::Null,
    }
}

/// Tag map as the `[{key, value}]` list the tag APIs expect
///
/// Entries are sorted by key.
pub fn expand_resource_tags_map(tags: &HashMap<String, Value>) -> Vec<serde_json::Value> {
    let mut keys: Vec<&String> = tags.keys().collect();
    keys.sort();
    keys.into_iter()
        .filter_map(|key| {
            let value = tags.get(key)?.as_str()?;
            Some(json!({"key": key, "value": value}))
        })
        .collect()
}

/// Tag list (`[{key, value}]`) from a response as an attribute map
pub fn flatten_tag_list(tags: &serde_json::Value) -> HashMap<String, Value> {
    let Some(items) = tags.as_array() else {
        return HashMap::new();
    };
    items
        .iter()
        .filter_map(|tag| {
            let key = tag.get("key")?.as_str()?;
            let value = tag.get("value").and_then(|v| v.as_str()).unwrap_or("");
            Some((key.to_string(), Value::String(value.to_string())))
        })
        .collect()
}
