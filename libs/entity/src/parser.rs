//! Translates between the flat wire-level entity dict and the nested,
//! typed shape a storage adapter keeps on disk, using a projection tree
//! as the map between the two.

use std::collections::HashMap;

use gateway_errors::{GatewayError, GatewayResult};
use serde_json::Value as Json;
use spec_model::route::Method;
use spec_model::{Node, ProjectionTree};

/// A flat `field -> value` view of an entity as it travels over the wire.
pub type Entity = HashMap<String, Json>;

/// Shapes a stored (nested) entity into the flat response body the schema's
/// `properties` describe. The primary key is always filled in from `id`,
/// even when the backing record doesn't carry it as an ordinary attribute.
/// Missing optional fields surface as JSON `null` rather than being omitted,
/// matching the schema's declared property set.
pub fn project_for_read(keys: &ProjectionTree, table_id: &str, id: &str, stored: &Json) -> Json {
    let mut out = serde_json::Map::new();
    for (field, node) in keys {
        if field == table_id {
            out.insert(field.clone(), Json::String(id.to_string()));
            continue;
        }
        out.insert(field.clone(), read_node(node, stored));
    }
    Json::Object(out)
}

fn read_node(node: &Node, stored: &Json) -> Json {
    match node {
        Node::Leaf { target, .. } => lookup_path(stored, target).cloned().unwrap_or(Json::Null),
        Node::Inner { target, properties } => {
            let scoped = lookup_path(stored, target).cloned().unwrap_or(Json::Null);
            let mut out = serde_json::Map::new();
            for (field, child) in properties {
                out.insert(field.clone(), read_node(child, &scoped));
            }
            Json::Object(out)
        }
    }
}

fn lookup_path<'a>(value: &'a Json, path: &[String]) -> Option<&'a Json> {
    let mut cur = value;
    for segment in path {
        cur = cur.get(segment)?;
    }
    Some(cur)
}

/// Builds the nested, storage-shaped entity from the flat wire body, for
/// `put`/`post`. Each projected field is written at its target path,
/// creating intermediate objects as needed. A required field absent (or
/// JSON `null`) from the body is a validation failure, except for the
/// primary key on `put` (supplied via the URL, not the body) and on `post`
/// (assigned by storage).
pub fn parse_for_write(
    keys: &ProjectionTree,
    table_id: &str,
    method: &Method,
    body: &Entity,
) -> GatewayResult<Json> {
    let mut out = Json::Object(serde_json::Map::new());

    for (field, node) in keys {
        if field == table_id && matches!(method, Method::Put | Method::Post) {
            continue;
        }

        let value = body.get(field);
        let missing = match value {
            None => true,
            Some(v) => v.is_null(),
        };
        if node.is_required() && missing {
            return Err(GatewayError::ValidationFailed(format!(
                "Property '{field}' is required"
            )));
        }
        if let Some(value) = value {
            write_at_path(&mut out, node.target(), value.clone());
        }
    }

    Ok(out)
}

fn write_at_path(root: &mut Json, path: &[String], value: Json) {
    let mut cur = root;
    for segment in &path[..path.len().saturating_sub(1)] {
        let map = cur.as_object_mut().expect("write target is always an object");
        cur = map
            .entry(segment.clone())
            .or_insert_with(|| Json::Object(serde_json::Map::new()));
    }
    if let Some(last) = path.last() {
        cur.as_object_mut()
            .expect("write target is always an object")
            .insert(last.clone(), value);
    }
}
