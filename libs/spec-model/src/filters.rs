//! Query-filter and forced-filter parsing from OpenAPI operation parameters.

use serde_yaml::Value;
use tracing::warn;

use crate::loader::SpecDocument;

pub const RESERVED_PAGE_PARAMS: [&str; 3] = ["page_cursor", "page_size", "page_action"];
pub const FORCED_FILTER_NAME: &str = "_FORCED_FILTER";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparison {
    pub fn from_openapi(raw: &str) -> Option<Self> {
        Some(match raw {
            "equal_to" => Comparison::Eq,
            "not_equal_to" => Comparison::Ne,
            "less_than" => Comparison::Lt,
            "less_than_or_equal_to" => Comparison::Le,
            "greater_than" => Comparison::Gt,
            "greater_than_or_equal_to" => Comparison::Ge,
            _ => return None,
        })
    }

    pub fn as_symbol(&self) -> &'static str {
        match self {
            Comparison::Eq => "==",
            Comparison::Ne => "!=",
            Comparison::Lt => "<",
            Comparison::Le => "<=",
            Comparison::Gt => ">",
            Comparison::Ge => ">=",
        }
    }
}

/// A user-settable query-parameter-backed filter.
#[derive(Debug, Clone)]
pub struct QueryFilter {
    pub name: String,
    pub field: String,
    pub comparison: Comparison,
    pub schema_type: String,
    pub schema_format: Option<String>,
    pub required: bool,
}

/// `value` substitution directives for a forced filter, resolved by the
/// caller (identity collaborator / peer address) before reaching storage.
#[derive(Debug, Clone, PartialEq)]
pub enum ForcedValue {
    Literal(Value),
    Upn,
    Ip,
    NotExisting,
}

impl ForcedValue {
    fn parse(raw: &Value) -> Self {
        match raw.as_str() {
            Some("_UPN") => ForcedValue::Upn,
            Some("_IP") => ForcedValue::Ip,
            Some("_NOT_EXISTING") => ForcedValue::NotExisting,
            _ => ForcedValue::Literal(raw.clone()),
        }
    }
}

/// A server-imposed row-level predicate, never settable by the client.
#[derive(Debug, Clone)]
pub struct ForcedFilter {
    pub field: String,
    pub comparison: Comparison,
    pub value: ForcedValue,
}

const ACCEPTED_SCHEMA_TYPES: [&str; 4] = ["string", "number", "integer", "boolean"];

/// Parses the `query_filters` and `forced_filters` out of an operation's
/// `parameters` list. A `_FORCED_FILTER`-named parameter is always emitted
/// as a forced filter; anything else missing the required extensions is
/// logged and skipped, never a hard error — a spec may freely mix well- and
/// ill-formed parameters and only the latter are dropped.
pub fn parse_operation_filters(
    spec: &SpecDocument,
    operation: &Value,
) -> (Vec<QueryFilter>, Vec<ForcedFilter>) {
    let mut query_filters = Vec::new();
    let mut forced_filters = Vec::new();

    let Some(params) = operation.get("parameters").and_then(Value::as_sequence) else {
        return (query_filters, forced_filters);
    };

    for param in params {
        let resolved = match param.get("$ref").and_then(Value::as_str) {
            Some(r) => match spec.resolve(r) {
                Some(v) => v,
                None => continue,
            },
            None => param,
        };

        let Some("query") = resolved.get("in").and_then(Value::as_str) else {
            continue;
        };
        let Some(name) = resolved.get("name").and_then(Value::as_str) else {
            continue;
        };

        if name == FORCED_FILTER_NAME {
            if let Some(ff) = parse_forced_filter(resolved) {
                forced_filters.push(ff);
            }
            continue;
        }

        if RESERVED_PAGE_PARAMS.contains(&name) {
            continue;
        }

        match parse_query_filter(name, resolved) {
            Some(qf) => query_filters.push(qf),
            None => continue,
        }
    }

    (query_filters, forced_filters)
}

fn parse_query_filter(name: &str, resolved: &Value) -> Option<QueryFilter> {
    let schema = resolved.get("schema");
    let comparison_raw = resolved
        .get("x-query-filter-comparison")
        .and_then(Value::as_str);
    let field = resolved
        .get("x-query-filter-field")
        .and_then(Value::as_str);

    let (schema, comparison_raw, field) = match (schema, comparison_raw, field) {
        (Some(s), Some(c), Some(f)) => (s, c, f),
        _ => {
            warn!(param = name, "query param is missing a required x-query-filter-* extension");
            return None;
        }
    };

    let Some(comparison) = Comparison::from_openapi(comparison_raw) else {
        warn!(param = name, comparison = comparison_raw, "unsupported comparison");
        return None;
    };

    let schema_type = match schema.get("type").and_then(Value::as_str) {
        Some(t) if ACCEPTED_SCHEMA_TYPES.contains(&t) => t.to_string(),
        other => {
            warn!(param = name, ty = ?other, "unsupported schema type for query filter");
            return None;
        }
    };

    Some(QueryFilter {
        name: name.to_string(),
        field: field.to_string(),
        comparison,
        schema_type,
        schema_format: schema.get("format").and_then(Value::as_str).map(str::to_owned),
        required: resolved
            .get("required")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    })
}

fn parse_forced_filter(resolved: &Value) -> Option<ForcedFilter> {
    let field = resolved.get("x-query-filter-field").and_then(Value::as_str)?;
    let comparison_raw = resolved
        .get("x-query-filter-comparison")
        .and_then(Value::as_str)?;
    let comparison = Comparison::from_openapi(comparison_raw)?;
    let value = resolved
        .get("x-query-filter-value")
        .map(ForcedValue::parse)
        .unwrap_or(ForcedValue::NotExisting);

    Some(ForcedFilter {
        field: field.to_string(),
        comparison,
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(yaml: &str) -> SpecDocument {
        SpecDocument::from_str(yaml).unwrap()
    }

    #[test]
    fn parses_well_formed_query_filter() {
        let spec = spec(
            r#"
operation:
  parameters:
    - name: owner
      in: query
      schema: {type: string}
      x-query-filter-field: owner
      x-query-filter-comparison: equal_to
"#,
        );
        let op = spec.root().get("operation").unwrap();
        let (qf, ff) = parse_operation_filters(&spec, op);
        assert_eq!(qf.len(), 1);
        assert!(ff.is_empty());
        assert_eq!(qf[0].comparison, Comparison::Eq);
        assert_eq!(qf[0].field, "owner");
    }

    #[test]
    fn reserved_page_params_are_skipped() {
        let spec = spec(
            r#"
operation:
  parameters:
    - name: page_cursor
      in: query
      schema: {type: string}
"#,
        );
        let op = spec.root().get("operation").unwrap();
        let (qf, ff) = parse_operation_filters(&spec, op);
        assert!(qf.is_empty());
        assert!(ff.is_empty());
    }

    #[test]
    fn missing_extension_is_skipped_not_fatal() {
        let spec = spec(
            r#"
operation:
  parameters:
    - name: owner
      in: query
      schema: {type: string}
"#,
        );
        let op = spec.root().get("operation").unwrap();
        let (qf, ff) = parse_operation_filters(&spec, op);
        assert!(qf.is_empty());
        assert!(ff.is_empty());
    }

    #[test]
    fn forced_filter_name_always_emitted_as_forced() {
        let spec = spec(
            r#"
operation:
  parameters:
    - name: _FORCED_FILTER
      in: query
      x-query-filter-field: owner
      x-query-filter-comparison: equal_to
      x-query-filter-value: _UPN
"#,
        );
        let op = spec.root().get("operation").unwrap();
        let (qf, ff) = parse_operation_filters(&spec, op);
        assert!(qf.is_empty());
        assert_eq!(ff.len(), 1);
        assert_eq!(ff[0].value, ForcedValue::Upn);
    }

    #[test]
    fn unsupported_schema_type_is_skipped() {
        let spec = spec(
            r#"
operation:
  parameters:
    - name: meta
      in: query
      schema: {type: object}
      x-query-filter-field: meta
      x-query-filter-comparison: equal_to
"#,
        );
        let op = spec.root().get("operation").unwrap();
        let (qf, _ff) = parse_operation_filters(&spec, op);
        assert!(qf.is_empty());
    }
}
