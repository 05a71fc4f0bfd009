//! Walks an OpenAPI schema into a normalized projection tree used by both
//! entity parsing (writes) and response shaping (reads).

use indexmap::IndexMap;
use serde_yaml::Value;

use gateway_errors::{GatewayError, GatewayResult};

use crate::loader::SpecDocument;

/// A recursive `field -> node` mapping. Construction guarantees every leaf
/// has a non-empty `target`.
pub type ProjectionTree = IndexMap<String, Node>;

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Leaf {
        target: Vec<String>,
        required: bool,
        ty: Option<String>,
        format: Option<String>,
    },
    Inner {
        target: Vec<String>,
        properties: ProjectionTree,
    },
}

impl Node {
    pub fn target(&self) -> &[String] {
        match self {
            Node::Leaf { target, .. } => target,
            Node::Inner { target, .. } => target,
        }
    }

    pub fn is_required(&self) -> bool {
        matches!(self, Node::Leaf { required: true, .. })
    }
}

fn target_path(field: &str, prop: &Value) -> Vec<String> {
    match prop.get("x-target-field").and_then(Value::as_str) {
        Some(raw) => raw.split('.').map(str::to_owned).collect(),
        None => vec![field.to_string()],
    }
}

fn required_set(schema: &Value) -> Vec<String> {
    schema
        .get("required")
        .and_then(Value::as_sequence)
        .map(|seq| {
            seq.iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

/// Walks `schema.properties`, producing a normalized projection tree.
///
/// Nested `$ref`s with their own `properties` become inner nodes; inline
/// `array`/`dict` properties carrying a nested `$ref` recurse the same way;
/// everything else is a leaf copying the property descriptor's `type` and
/// `format`, annotated `required` when the field is named in the enclosing
/// schema's `required` list.
pub fn project(spec: &SpecDocument, schema: &Value) -> ProjectionTree {
    let mut tree = ProjectionTree::new();
    let Some(properties) = schema.get("properties").and_then(Value::as_mapping) else {
        return tree;
    };
    let required = required_set(schema);

    for (key, prop) in properties {
        let Some(field) = key.as_str() else { continue };
        let target = target_path(field, prop);
        let is_required = required.iter().any(|r| r == field);

        let node = if let Some(r) = prop.get("$ref").and_then(Value::as_str) {
            match spec.resolve(r) {
                Some(referenced) if referenced.get("properties").is_some() => Node::Inner {
                    target,
                    properties: project(spec, referenced),
                },
                Some(referenced) => leaf_from(target, is_required, referenced),
                None => leaf_from(target, is_required, prop),
            }
        } else if matches!(
            prop.get("type").and_then(Value::as_str),
            Some("array") | Some("dict")
        ) {
            match nested_ref_schema(spec, prop) {
                Some(nested) => Node::Inner {
                    target,
                    properties: project(spec, nested),
                },
                None => leaf_from(target, is_required, prop),
            }
        } else {
            leaf_from(target, is_required, prop)
        };

        tree.insert(field.to_string(), node);
    }

    tree
}

fn leaf_from(target: Vec<String>, required: bool, prop: &Value) -> Node {
    Node::Leaf {
        target,
        required,
        ty: prop
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_owned),
        format: prop
            .get("format")
            .and_then(Value::as_str)
            .map(str::to_owned),
    }
}

/// Looks for a nested `$ref` inside an inline `array`/`dict` property (e.g.
/// `items.$ref` for an array, or `additionalProperties.$ref` for a dict).
fn nested_ref_schema<'a>(spec: &'a SpecDocument, prop: &'a Value) -> Option<&'a Value> {
    let mapping = prop.as_mapping()?;
    for (_, v) in mapping {
        if let Some(r) = v.get("$ref").and_then(Value::as_str) {
            return spec.resolve(r);
        }
    }
    None
}

/// Discovers the primary-key field name: `x-db-table-id` on the schema
/// itself, else the first structured (array/dict) child's own discovery.
pub fn find_table_id(spec: &SpecDocument, schema: &Value) -> Option<String> {
    if let Some(id) = schema.get("x-db-table-id").and_then(Value::as_str) {
        return Some(id.to_string());
    }

    let properties = schema.get("properties").and_then(Value::as_mapping)?;
    for (_, prop) in properties {
        if matches!(
            prop.get("type").and_then(Value::as_str),
            Some("array") | Some("dict")
        ) {
            if let Some(nested) = nested_ref_schema(spec, prop) {
                if let Some(id) = find_table_id(spec, nested) {
                    return Some(id);
                }
            }
        }
    }
    None
}

/// A list/page response schema projects to `{"results": Inner{properties:
/// <item-shape>}}` rather than the item shape directly — `results` names the
/// array, its `Inner::properties` is the per-row projection tree. Returns
/// 400 when `results` is absent, per the adapter contract that a paginated
/// response schema must declare it.
pub fn results_item_tree(keys: &ProjectionTree) -> GatewayResult<&ProjectionTree> {
    match keys.get("results") {
        Some(Node::Inner { properties, .. }) => Ok(properties),
        _ => Err(GatewayError::ValidationFailed("results key missing".to_string())),
    }
}
