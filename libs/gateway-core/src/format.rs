//! Alternate response representations, negotiated off `Accept`. JSON is
//! handled inline by the generic handler; everything else goes through this
//! seam so new formats can be added without touching dispatch logic.

use serde_json::Value as Json;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatError {
    Unsupported(&'static str),
}

pub trait ContentFormatter: Send + Sync {
    fn content_type(&self) -> &'static str;
    fn format(&self, entities: &[Json]) -> Result<String, FormatError>;
}

/// Flattens each entity's top-level scalar fields into a CSV row. Nested
/// objects/arrays are serialized as their JSON text rather than expanded
/// into further columns — a deliberately simple rendering, not a full CSV
/// projection engine.
#[derive(Debug, Default, Clone, Copy)]
pub struct CsvFormatter;

impl ContentFormatter for CsvFormatter {
    fn content_type(&self) -> &'static str {
        "text/csv"
    }

    fn format(&self, entities: &[Json]) -> Result<String, FormatError> {
        let Some(first) = entities.first() else {
            return Ok(String::new());
        };
        let Some(columns) = first.as_object().map(|o| o.keys().cloned().collect::<Vec<_>>()) else {
            return Ok(String::new());
        };

        let mut out = columns.join(",");
        out.push('\n');

        for entity in entities {
            let Some(obj) = entity.as_object() else { continue };
            let row: Vec<String> = columns
                .iter()
                .map(|c| csv_cell(obj.get(c).unwrap_or(&Json::Null)))
                .collect();
            out.push_str(&row.join(","));
            out.push('\n');
        }

        Ok(out)
    }
}

fn csv_cell(value: &Json) -> String {
    let raw = match value {
        Json::Null => String::new(),
        Json::String(s) => s.clone(),
        other => other.to_string(),
    };
    if raw.contains(',') || raw.contains('"') || raw.contains('\n') {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw
    }
}

/// xlsx/pdf rendering requires a dedicated document-generation
/// collaborator this crate does not ship; callers should surface a 501.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedFormatter {
    pub name: &'static str,
}

impl ContentFormatter for UnsupportedFormatter {
    fn content_type(&self) -> &'static str {
        self.name
    }

    fn format(&self, _entities: &[Json]) -> Result<String, FormatError> {
        Err(FormatError::Unsupported(self.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn csv_formats_rows_in_schema_order() {
        let formatter = CsvFormatter;
        let entities = vec![json!({"id": "1", "name": "bolt"}), json!({"id": "2", "name": "nut"})];
        let out = formatter.format(&entities).unwrap();
        assert_eq!(out, "id,name\n1,bolt\n2,nut\n");
    }

    #[test]
    fn csv_quotes_values_containing_commas() {
        let formatter = CsvFormatter;
        let entities = vec![json!({"note": "a, b"})];
        let out = formatter.format(&entities).unwrap();
        assert_eq!(out, "note\n\"a, b\"\n");
    }

    #[test]
    fn empty_entities_produce_empty_output() {
        let formatter = CsvFormatter;
        assert_eq!(formatter.format(&[]).unwrap(), "");
    }

    #[test]
    fn unsupported_formatter_errors() {
        let formatter = UnsupportedFormatter { name: "application/pdf" };
        assert_eq!(
            formatter.format(&[]).unwrap_err(),
            FormatError::Unsupported("application/pdf")
        );
    }
}
