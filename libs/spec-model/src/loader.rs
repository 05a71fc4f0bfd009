//! Loads the OpenAPI document once at startup and resolves `$ref`s on demand.

use std::path::Path;

use serde_yaml::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpecError {
    #[error("failed to read spec file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse spec YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// The loaded OpenAPI document. Immutable after construction and intended to
/// be shared behind an `Arc` for the lifetime of the process — there is no
/// reload and no interior mutability.
#[derive(Debug, Clone)]
pub struct SpecDocument {
    root: Value,
}

impl SpecDocument {
    pub fn from_str(yaml: &str) -> Result<Self, SpecError> {
        let root: Value = serde_yaml::from_str(yaml)?;
        Ok(Self { root })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SpecError> {
        let path_ref = path.as_ref();
        let raw = std::fs::read_to_string(path_ref).map_err(|source| SpecError::Io {
            path: path_ref.display().to_string(),
            source,
        })?;
        Self::from_str(&raw)
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    pub fn paths(&self) -> Option<&Value> {
        self.root.get("paths")
    }

    /// Returns the PathObject for a normalized path template, e.g. `/widgets/{id}`.
    pub fn path_object(&self, template: &str) -> Option<&Value> {
        self.paths()?.get(template)
    }

    /// Resolves a `#/a/b/c`-style internal reference, walking segments one
    /// at a time. Returns `None` for any unknown segment.
    pub fn resolve(&self, reference: &str) -> Option<&Value> {
        let path = reference.strip_prefix("#/")?;
        let mut node = &self.root;
        for segment in path.split('/') {
            if segment.is_empty() {
                continue;
            }
            node = node.get(segment)?;
        }
        Some(node)
    }

    /// Follows `schema.$ref` (if present) to the referenced schema object,
    /// otherwise returns `schema` itself.
    pub fn resolve_schema<'a>(&'a self, schema: &'a Value) -> Option<&'a Value> {
        match schema.get("$ref").and_then(Value::as_str) {
            Some(r) => self.resolve(r),
            None => Some(schema),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
paths:
  /widgets/<int:id>:
    x-db-table-name: Widget
    get:
      responses:
        '200':
          content:
            application/json:
              schema:
                $ref: '#/components/schemas/Widget'
components:
  schemas:
    Widget:
      x-db-table-id: id
      properties:
        id:
          type: string
        name:
          type: string
"#;

    #[test]
    fn loads_and_resolves_refs() {
        let doc = SpecDocument::from_str(YAML).unwrap();
        let schema = doc.resolve("#/components/schemas/Widget").unwrap();
        assert_eq!(schema.get("x-db-table-id").unwrap().as_str(), Some("id"));
    }

    #[test]
    fn unknown_ref_returns_none() {
        let doc = SpecDocument::from_str(YAML).unwrap();
        assert!(doc.resolve("#/components/schemas/Nope").is_none());
    }

    #[test]
    fn resolve_schema_follows_ref_and_passes_through_inline() {
        let doc = SpecDocument::from_str(YAML).unwrap();
        let op = doc
            .path_object("/widgets/<int:id>")
            .unwrap()
            .get("get")
            .unwrap();
        let schema_ref = op
            .get("responses")
            .unwrap()
            .get("200")
            .unwrap()
            .get("content")
            .unwrap()
            .get("application/json")
            .unwrap()
            .get("schema")
            .unwrap();
        let resolved = doc.resolve_schema(schema_ref).unwrap();
        assert_eq!(
            resolved.get("x-db-table-id").unwrap().as_str(),
            Some("id")
        );

        let inline = serde_yaml::from_str::<Value>("type: string").unwrap();
        assert_eq!(doc.resolve_schema(&inline).unwrap(), &inline);
    }
}
