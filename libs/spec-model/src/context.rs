//! The per-request bundle the generic handler threads through parsing,
//! filtering, and storage dispatch.

use std::collections::HashMap;

use crate::filters::{ForcedFilter, QueryFilter};
use crate::projection::ProjectionTree;
use crate::route::{Method, ResolvedRoute};

/// Resolved routing + schema information plus the concrete values pulled off
/// the inbound request (path params, query params, caller identity).
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    pub path_template: String,
    pub table_name: Option<String>,
    pub table_id: Option<String>,
    pub keys: ProjectionTree,
    pub request_id_param: Option<String>,
    pub query_filters: Vec<QueryFilter>,
    pub forced_filters: Vec<ForcedFilter>,
    pub path_params: HashMap<String, String>,
    pub query_params: HashMap<String, String>,
    pub caller_upn: Option<String>,
    pub caller_ip: Option<String>,
}

impl RequestContext {
    pub fn new(
        method: Method,
        path_template: impl Into<String>,
        route: ResolvedRoute,
        path_params: HashMap<String, String>,
        query_params: HashMap<String, String>,
    ) -> Self {
        Self {
            method,
            path_template: path_template.into(),
            table_name: route.table_name,
            table_id: route.table_id,
            keys: route.keys,
            request_id_param: route.request_id,
            query_filters: route.query_filters,
            forced_filters: route.forced_filters,
            path_params,
            query_params,
            caller_upn: None,
            caller_ip: None,
        }
    }

    pub fn with_identity(mut self, upn: Option<String>, ip: Option<String>) -> Self {
        self.caller_upn = upn;
        self.caller_ip = ip;
        self
    }

    /// The entity identifier pulled from the path, if this route names one.
    pub fn entity_id(&self) -> Option<&str> {
        let name = self.request_id_param.as_deref()?;
        self.path_params.get(name).map(String::as_str)
    }

    /// `false` when the routing/schema configuration is incomplete enough
    /// that the generic handler cannot proceed at all.
    pub fn is_configured(&self) -> bool {
        self.table_name.is_some() && self.table_id.is_some() && !self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::SpecDocument;
    use crate::route::resolve_route;

    const YAML: &str = r#"
paths:
  /widgets/{id}:
    x-db-table-name: Widget
    get:
      parameters:
        - name: id
          in: path
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
        id: {type: string}
"#;

    #[test]
    fn entity_id_reads_from_path_params() {
        let spec = SpecDocument::from_str(YAML).unwrap();
        let route = resolve_route(&spec, "/widgets/{id}", &Method::Get, "application/json")
            .unwrap()
            .unwrap();
        let mut path_params = HashMap::new();
        path_params.insert("id".to_string(), "abc123".to_string());
        let ctx = RequestContext::new(Method::Get, "/widgets/{id}", route, path_params, HashMap::new());
        assert_eq!(ctx.entity_id(), Some("abc123"));
        assert!(ctx.is_configured());
    }

    #[test]
    fn unconfigured_route_reports_not_configured() {
        let spec = SpecDocument::from_str(YAML).unwrap();
        let route = ResolvedRoute {
            table_name: None,
            table_id: None,
            keys: ProjectionTree::new(),
            request_id: None,
            query_filters: vec![],
            forced_filters: vec![],
        };
        let _ = &spec;
        let ctx = RequestContext::new(Method::Get, "/widgets/{id}", route, HashMap::new(), HashMap::new());
        assert!(!ctx.is_configured());
    }
}
