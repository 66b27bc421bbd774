//! Local, schema-driven planning.
//!
//! Planning never talks to the API. The planned state is the proposed
//! configuration with defaults filled in and computed attributes carried over
//! from prior state; every top-level attribute that differs from prior state
//! becomes an [`AttributeChange`].

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::schema::Schema;
use crate::types::{AttributeChange, PlanResult};

/// Plan a resource against its schema.
///
/// `prior` is `None` on create and `proposed` is `None` on destroy.
pub fn plan(schema: &Schema, prior: Option<&Value>, proposed: Option<Value>) -> PlanResult {
    let Some(proposed) = proposed else {
        return plan_destroy(prior);
    };

    let mut planned = match proposed {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    for (name, attr) in &schema.block.attributes {
        if present(planned.get(name)).is_some() {
            continue;
        }
        if let Some(default) = &attr.default {
            planned.insert(name.clone(), default.clone());
        } else if attr.flags.computed {
            if let Some(value) = present(prior.and_then(|p| p.get(name))) {
                planned.insert(name.clone(), value.clone());
            }
        }
    }

    let mut keys: BTreeSet<&str> = schema
        .block
        .attributes
        .keys()
        .map(String::as_str)
        .collect();
    keys.extend(planned.keys().map(String::as_str));

    let mut changes = Vec::new();
    let mut requires_replace = false;
    for key in keys {
        let before = present(prior.and_then(|p| p.get(key)));
        let after = present(planned.get(key));
        let change = match (before, after) {
            (None, Some(after)) => AttributeChange::added(key, after.clone()),
            (Some(before), None) => AttributeChange::removed(key, before.clone()),
            (Some(before), Some(after)) if before != after => {
                AttributeChange::modified(key, before.clone(), after.clone())
            }
            _ => continue,
        };
        if prior.is_some() && schema.attribute(key).is_some_and(|a| a.force_new) {
            requires_replace = true;
        }
        changes.push(change);
    }

    PlanResult::with_changes(Value::Object(planned), changes, requires_replace)
}

fn plan_destroy(prior: Option<&Value>) -> PlanResult {
    let mut changes: Vec<AttributeChange> = prior
        .and_then(Value::as_object)
        .into_iter()
        .flatten()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| AttributeChange::removed(k.clone(), v.clone()))
        .collect();
    changes.sort_by(|a, b| a.path.cmp(&b.path));
    PlanResult::with_changes(Value::Null, changes, false)
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}
