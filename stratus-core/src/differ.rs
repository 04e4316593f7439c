//! Differ - Compare desired state with current state
//!
//! Compares the desired attributes of a resource with the state fetched
//! from the Provider, and decides whether it needs creating, updating in
//! place, or replacing.

use std::collections::HashMap;

use crate::resource::{Resource, ResourceId, State, Value};
use crate::schema::ResourceSchema;

/// Result of a diff operation
#[derive(Debug, Clone, PartialEq)]
pub enum Diff {
    /// Resource does not exist -> needs creation
    Create(Resource),
    /// Resource exists with differences -> needs update
    Update {
        id: ResourceId,
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
    },
    /// A force-new attribute changed -> delete and create again
    Replace {
        id: ResourceId,
        from: State,
        to: Resource,
        forcing_attributes: Vec<String>,
    },
    /// Resource exists with no differences -> no action needed
    NoChange(ResourceId),
}

/// Compare desired state with current state to compute a Diff
pub fn diff(schema: &ResourceSchema, desired: &Resource, current: &State) -> Diff {
    if !current.exists {
        return Diff::Create(desired.clone());
    }

    let changed = changed_attributes(schema, &desired.attributes, &current.attributes);

    let force_new = schema.force_new_attributes();
    let forcing: Vec<String> = changed
        .iter()
        .filter(|name| force_new.contains(&name.as_str()))
        .cloned()
        .collect();

    if !forcing.is_empty() {
        Diff::Replace {
            id: desired.id.clone(),
            from: current.clone(),
            to: desired.clone(),
            forcing_attributes: forcing,
        }
    } else if changed.is_empty() {
        Diff::NoChange(desired.id.clone())
    } else {
        Diff::Update {
            id: desired.id.clone(),
            from: current.clone(),
            to: desired.clone(),
            changed_attributes: changed,
        }
    }
}

/// Find changed attributes between desired and current state
///
/// Write-only attributes are never reported. An attribute the caller left
/// out counts as changed only when the current state still has a value
/// for it and the attribute is not computed.
pub fn changed_attributes(
    schema: &ResourceSchema,
    desired: &HashMap<String, Value>,
    current: &HashMap<String, Value>,
) -> Vec<String> {
    let mut changed = Vec::new();

    for (key, desired_value) in desired {
        if schema.attributes.get(key).is_some_and(|a| a.write_only) {
            continue;
        }

        match current.get(key) {
            Some(current_value) if current_value == desired_value => {}
            _ => changed.push(key.clone()),
        }
    }

    for (key, attr) in &schema.attributes {
        if attr.write_only || attr.computed || desired.contains_key(key) {
            continue;
        }
        if current.get(key).is_some_and(|v| !is_empty_value(v)) {
            changed.push(key.clone());
        }
    }

    changed.sort_unstable();
    changed
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::String(s) => s.is_empty(),
        Value::Bool(b) => !b,
        Value::Int(i) => *i == 0,
        Value::List(items) => items.is_empty(),
        Value::Map(map) => map.is_empty(),
    }
}
