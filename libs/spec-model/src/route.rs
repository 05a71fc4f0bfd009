//! Resolves an inbound HTTP method + path template into everything the
//! generic handler needs: the backing table name/id, the projection keys,
//! the path identifier parameter, and the request's query filters.

use gateway_errors::{GatewayError, GatewayResult};
use serde_yaml::Value;

use crate::filters::{parse_operation_filters, ForcedFilter, QueryFilter};
use crate::loader::SpecDocument;
use crate::projection::{find_table_id, project, ProjectionTree};

/// Status codes considered, in preference order, when hunting a `get`
/// operation's response schema.
const RESPONSE_CODES: [&str; 5] = ["200", "201", "202", "203", "204"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
    Post,
    Patch,
    Delete,
}

impl Method {
    pub fn as_openapi(&self) -> &'static str {
        match self {
            Method::Get => "get",
            Method::Put => "put",
            Method::Post => "post",
            Method::Patch => "patch",
            Method::Delete => "delete",
        }
    }
}

/// Everything the generic handler needs, resolved once per request.
#[derive(Debug, Clone)]
pub struct ResolvedRoute {
    pub table_name: Option<String>,
    pub table_id: Option<String>,
    pub keys: ProjectionTree,
    pub request_id: Option<String>,
    pub query_filters: Vec<QueryFilter>,
    pub forced_filters: Vec<ForcedFilter>,
}

/// Converts a Flask/werkzeug-style route template (`/widgets/<int:id>`) into
/// the axum-style template (`/widgets/{id}`) used as the OpenAPI path key.
pub fn normalize_path_template(raw: &str) -> String {
    raw.replace("int:", "")
        .replace('<', "{")
        .replace('>', "}")
}

/// Falls back to scanning every path key, normalizing each, for documents
/// whose raw keys are still in werkzeug style (`/widgets/<int:id>`) while
/// the caller (routing off `axum::extract::MatchedPath`) already has the
/// normalized `{id}` form.
fn find_path_object_by_normalized_key<'a>(spec: &'a SpecDocument, template: &str) -> Option<&'a Value> {
    let paths = spec.paths()?.as_mapping()?;
    for (key, value) in paths {
        let Some(key) = key.as_str() else { continue };
        if normalize_path_template(key) == template {
            return Some(value);
        }
    }
    None
}

/// Resolves a route. Returns `Ok(None)` when the path template or HTTP
/// method isn't present in the document at all — the caller maps that to
/// `RouteUnknown`/500. Returns `Err(ContentTypeNegotiationFailed)` when the
/// route exists but the requested `Accept` media type (GET only) isn't
/// among the operation's declared response content-types (§4.2 step 6).
pub fn resolve_route(
    spec: &SpecDocument,
    template: &str,
    method: &Method,
    accept: &str,
) -> GatewayResult<Option<ResolvedRoute>> {
    let Some(path_object) = spec
        .path_object(template)
        .or_else(|| find_path_object_by_normalized_key(spec, template))
    else {
        return Ok(None);
    };
    let Some(operation) = path_object.get(method.as_openapi()) else {
        return Ok(None);
    };

    let table_name = path_object
        .get("x-db-table-name")
        .and_then(Value::as_str)
        .map(str::to_owned);

    let request_id = request_id_param(operation);
    let (query_filters, forced_filters) = parse_operation_filters(spec, operation);

    let content_type = if matches!(method, Method::Get) {
        negotiate_content_type(operation, accept)?
    } else {
        "application/json".to_string()
    };

    let schema_ref = path_schema_reference(operation, method, &content_type);
    let schema = schema_ref.and_then(|r| spec.resolve(&r));

    let (table_id, keys) = match schema {
        Some(schema) => (find_table_id(spec, schema), project(spec, schema)),
        None => (None, ProjectionTree::new()),
    };

    Ok(Some(ResolvedRoute {
        table_name,
        table_id,
        keys,
        request_id,
        query_filters,
        forced_filters,
    }))
}

/// The content-types declared for the first response status code (in
/// `RESPONSE_CODES` preference order) that carries a `content` map at all.
fn declared_response_content_types(operation: &Value) -> Vec<String> {
    for code in RESPONSE_CODES {
        if let Some(content) = operation
            .get("responses")
            .and_then(|r| r.get(code))
            .and_then(|r| r.get("content"))
            .and_then(Value::as_mapping)
        {
            return content
                .keys()
                .filter_map(|k| k.as_str().map(str::to_owned))
                .collect();
        }
    }
    Vec::new()
}

/// The first media type named in an `Accept` header, ignoring `q=`
/// parameters; an empty or wildcard `Accept` defaults to `application/json`
/// per §4.2 step 6.
fn primary_media_type(accept: &str) -> String {
    let candidate = accept
        .split(',')
        .next()
        .unwrap_or("")
        .split(';')
        .next()
        .unwrap_or("")
        .trim();
    if candidate.is_empty() || candidate == "*/*" {
        "application/json".to_string()
    } else {
        candidate.to_string()
    }
}

/// Fails with `ContentTypeNegotiationFailed` when the operation declares
/// response content-types and the requested one isn't among them. An
/// operation with no declared content at all has nothing to negotiate
/// against and passes through.
fn negotiate_content_type(operation: &Value, accept: &str) -> GatewayResult<String> {
    let requested = primary_media_type(accept);
    let declared = declared_response_content_types(operation);
    if declared.is_empty() || declared.iter().any(|c| c == &requested) {
        return Ok(requested);
    }
    Err(GatewayError::ContentTypeNegotiationFailed(format!(
        "content-type '{requested}' is not found within the specification"
    )))
}

/// The first `path`-located, non-reserved parameter name is the entity
/// identifier placeholder (`id` in `/widgets/{id}`).
fn request_id_param(operation: &Value) -> Option<String> {
    let params = operation.get("parameters")?.as_sequence()?;
    params.iter().find_map(|param| {
        let name = param.get("name")?.as_str()?;
        if matches!(name, "page_cursor" | "page_size" | "page_action") {
            return None;
        }
        if param.get("in")?.as_str()? != "path" {
            return None;
        }
        Some(name.to_string())
    })
}

fn path_schema_reference(operation: &Value, method: &Method, content_type: &str) -> Option<String> {
    match method {
        Method::Get => {
            for code in RESPONSE_CODES {
                if let Some(r) = operation
                    .get("responses")
                    .and_then(|r| r.get(code))
                    .and_then(|r| r.get("content"))
                    .and_then(|c| c.get(content_type))
                    .and_then(|c| c.get("schema"))
                    .and_then(|s| s.get("$ref"))
                    .and_then(Value::as_str)
                {
                    return Some(r.to_string());
                }
            }
            None
        }
        Method::Put | Method::Post | Method::Patch => operation
            .get("requestBody")
            .and_then(|b| b.get("content"))
            .and_then(|c| c.get("application/json"))
            .and_then(|c| c.get("schema"))
            .and_then(|s| s.get("$ref"))
            .and_then(Value::as_str)
            .map(str::to_owned),
        Method::Delete => None,
    }
}

/// Builds the pagination `next_page` URL: the route's path template, sans
/// any `{placeholder}` segments, with a `/pages` segment appended unless
/// already present.
pub fn pagination_base_segment(template: &str) -> String {
    let stripped: String = template
        .split('/')
        .filter(|seg| !(seg.starts_with('{') && seg.ends_with('}')))
        .collect::<Vec<_>>()
        .join("/");
    let trimmed = stripped.trim_matches('/');
    if trimmed.ends_with("/pages") || trimmed == "pages" {
        trimmed.to_string()
    } else {
        format!("{trimmed}/pages")
    }
}
