//! Synchronous, diff-based audit trail. Recorded on a best-effort basis —
//! a failure to persist an audit record never fails the request it
//! describes.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as Json;

#[derive(Clone, Debug, Serialize)]
pub struct AttributeChange {
    pub attribute: String,
    pub old: Option<Json>,
    pub new: Option<Json>,
}

#[derive(Clone, Debug, Serialize)]
pub struct AuditRecord {
    pub table_name: String,
    pub table_id: String,
    pub attributes_changed: Vec<AttributeChange>,
    pub timestamp: DateTime<Utc>,
    pub user: Option<String>,
}

/// Computes the union of changed attributes between an old and new entity.
/// An attribute present in only one side is reported with the other side
/// as `None`; unions with no differences produce an empty `Vec`, which the
/// caller treats as "nothing to log".
pub fn diff(old: &Json, new: &Json) -> Vec<AttributeChange> {
    let old_map = old.as_object();
    let new_map = new.as_object();

    let mut keys: Vec<&String> = Vec::new();
    if let Some(m) = old_map {
        keys.extend(m.keys());
    }
    if let Some(m) = new_map {
        for k in m.keys() {
            if !keys.contains(&k) {
                keys.push(k);
            }
        }
    }

    let mut changes = Vec::new();
    for key in keys {
        let old_value = old_map.and_then(|m| m.get(key));
        let new_value = new_map.and_then(|m| m.get(key));
        if old_value != new_value {
            changes.push(AttributeChange {
                attribute: key.clone(),
                old: old_value.cloned(),
                new: new_value.cloned(),
            });
        }
    }
    changes
}
