//! The generic handler: the single piece of code that answers every route
//! the loaded OpenAPI document describes, dispatching on HTTP method and
//! the route's resolved schema/table binding rather than on per-route code.

use std::sync::Arc;

use entity::{parse_for_write, project_for_read, validate_forced_filters, CallerContext, Entity};
use gateway_errors::{GatewayError, GatewayResult};
use serde_json::Value as Json;
use spec_model::filters::ForcedValue;
use spec_model::{pagination_base_segment, results_item_tree, Comparison, RequestContext};
use storage_core::{PageAction, PageRequest, StorageAdapter, StorageRequest, StoredFilter};
use tracing::warn;

use crate::coerce::coerce_query_value;

pub struct GenericHandler {
    adapter: Arc<dyn StorageAdapter>,
}

/// Pagination-specific inputs lifted out of the query string, kept separate
/// from `RequestContext::query_params` since they're reserved names rather
/// than schema-declared filters.
#[derive(Debug, Clone)]
pub struct PaginationParams {
    pub cursor: Option<String>,
    pub size: u32,
    pub action: PageAction,
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            cursor: None,
            size: 50,
            action: PageAction::Next,
        }
    }
}

impl GenericHandler {
    pub fn new(adapter: Arc<dyn StorageAdapter>) -> Self {
        Self { adapter }
    }

    fn require_configured(ctx: &RequestContext) -> GatewayResult<(String, String)> {
        if !ctx.is_configured() {
            return Err(GatewayError::ConfigIncomplete(
                "Database information insufficient".to_string(),
            ));
        }
        Ok((
            ctx.table_name.clone().expect("checked by is_configured"),
            ctx.table_id.clone().expect("checked by is_configured"),
        ))
    }

    fn require_entity_id<'a>(ctx: &'a RequestContext) -> GatewayResult<&'a str> {
        ctx.entity_id()
            .ok_or_else(|| GatewayError::ConfigIncomplete("Identifier name not found".to_string()))
    }

    fn stored_query_filters(ctx: &RequestContext) -> GatewayResult<Vec<StoredFilter>> {
        let mut out = Vec::new();
        for qf in &ctx.query_filters {
            let Some(raw) = ctx.query_params.get(&qf.name) else {
                if qf.required {
                    return Err(GatewayError::ValidationFailed(format!(
                        "missing required query param '{}'",
                        qf.name
                    )));
                }
                continue;
            };
            let value = coerce_query_value(raw, &qf.schema_type, qf.schema_format.as_deref(), &qf.name)?;
            out.push(StoredFilter {
                field: qf.field.clone(),
                comparison: qf.comparison,
                value,
            });
        }
        Ok(out)
    }

    /// Forced filters are pushed into the storage query itself for
    /// multi-entity operations: a caller simply never sees rows they are
    /// not entitled to, rather than receiving a 401 for each one. The
    /// `_NOT_EXISTING` directive has no clean storage-query translation and
    /// is skipped here (logged); it is still enforced on single-entity
    /// reads via [`validate_forced_filters`].
    fn forced_storage_filters(ctx: &RequestContext, caller: &CallerContext) -> Vec<StoredFilter> {
        let mut out = Vec::new();
        for ff in &ctx.forced_filters {
            let value = match &ff.value {
                ForcedValue::Upn => caller.upn.clone().map(Json::String),
                ForcedValue::Ip => caller.ip.clone().map(Json::String),
                ForcedValue::Literal(v) => Some(v.clone()),
                ForcedValue::NotExisting => {
                    warn!(field = %ff.field, "skipping _NOT_EXISTING forced filter in list query");
                    None
                }
            };
            if let Some(value) = value {
                out.push(StoredFilter {
                    field: ff.field.clone(),
                    comparison: ff.comparison,
                    value,
                });
            }
        }
        out
    }

    pub async fn get_single(&self, ctx: &RequestContext, caller: &CallerContext) -> GatewayResult<Option<Json>> {
        let (table_name, table_id) = Self::require_configured(ctx)?;
        let id = Self::require_entity_id(ctx)?;

        let req = StorageRequest {
            table_name: &table_name,
            table_id: &table_id,
            keys: &ctx.keys,
            filters: &[],
        };
        let Some(stored) = self.adapter.get_single(&req, id).await? else {
            return Ok(None);
        };

        validate_forced_filters(&ctx.forced_filters, Some(&stored), caller)?;
        Ok(Some(project_for_read(&ctx.keys, &table_id, id, &stored)))
    }

    pub async fn put_single(
        &self,
        ctx: &RequestContext,
        caller: &CallerContext,
        body: &Entity,
    ) -> GatewayResult<Option<Json>> {
        let (table_name, table_id) = Self::require_configured(ctx)?;
        let id = Self::require_entity_id(ctx)?;

        let req = StorageRequest {
            table_name: &table_name,
            table_id: &table_id,
            keys: &ctx.keys,
            filters: &[],
        };

        let existing = self.adapter.get_single(&req, id).await?;
        validate_forced_filters(&ctx.forced_filters, existing.as_ref(), caller)?;

        let write_body = parse_for_write(&ctx.keys, &table_id, &ctx.method, body)?;
        let Some(stored) = self.adapter.put_single(&req, id, write_body).await? else {
            return Ok(None);
        };
        Ok(Some(project_for_read(&ctx.keys, &table_id, id, &stored)))
    }

    pub async fn post_single(&self, ctx: &RequestContext, body: &Entity) -> GatewayResult<Json> {
        let (table_name, table_id) = Self::require_configured(ctx)?;
        let write_body = parse_for_write(&ctx.keys, &table_id, &ctx.method, body)?;

        let req = StorageRequest {
            table_name: &table_name,
            table_id: &table_id,
            keys: &ctx.keys,
            filters: &[],
        };
        let (id, stored) = self.adapter.post_single(&req, write_body).await?;
        Ok(project_for_read(&ctx.keys, &table_id, &id, &stored))
    }

    pub async fn get_multiple(&self, ctx: &RequestContext, caller: &CallerContext) -> GatewayResult<Vec<Json>> {
        let (table_name, table_id) = Self::require_configured(ctx)?;
        let mut filters = Self::stored_query_filters(ctx)?;
        filters.extend(Self::forced_storage_filters(ctx, caller));

        let req = StorageRequest {
            table_name: &table_name,
            table_id: &table_id,
            keys: &ctx.keys,
            filters: &filters,
        };
        let item_keys = results_item_tree(&ctx.keys)?;
        let rows = self.adapter.get_multiple(&req).await?;
        Ok(rows
            .into_iter()
            .map(|(id, stored)| project_for_read(item_keys, &table_id, &id, &stored))
            .collect())
    }

    /// Returns `(items, next_page, prev_page)`. `prev_page` is only ever
    /// `Some` when the request itself carried a cursor — re-running the
    /// very first page has nothing to page backward from.
    pub async fn get_multiple_page(
        &self,
        ctx: &RequestContext,
        caller: &CallerContext,
        pagination: &PaginationParams,
        base_url: &str,
    ) -> GatewayResult<(Vec<Json>, Option<String>, Option<String>)> {
        let (table_name, table_id) = Self::require_configured(ctx)?;
        let mut filters = Self::stored_query_filters(ctx)?;
        filters.extend(Self::forced_storage_filters(ctx, caller));

        let filter_hash = cursor_codec::hash_filters(&canonical_filter_parts(&filters));

        let req = StorageRequest {
            table_name: &table_name,
            table_id: &table_id,
            keys: &ctx.keys,
            filters: &filters,
        };
        let page_req = PageRequest {
            request: req,
            cursor: pagination.cursor.clone(),
            page_size: pagination.size,
            action: pagination.action,
            filter_hash,
        };

        let item_keys = results_item_tree(&ctx.keys)?;
        let page = self.adapter.get_multiple_page(&page_req).await?;
        let items: Vec<Json> = page
            .items
            .into_iter()
            .map(|(id, stored)| project_for_read(item_keys, &table_id, &id, &stored))
            .collect();

        let segment = pagination_base_segment(&ctx.path_template);
        let next_page = page.page_info.next_page.map(|cursor| {
            format!("{base_url}/{segment}/{cursor}?page_size={}&page_action=next", pagination.size)
        });
        let prev_page = pagination.cursor.as_ref().map(|cursor| {
            format!("{base_url}/{segment}/{cursor}?page_size={}&page_action=prev", pagination.size)
        });

        Ok((items, next_page, prev_page))
    }
}

fn canonical_filter_parts(filters: &[StoredFilter]) -> Vec<String> {
    let mut parts: Vec<String> = filters
        .iter()
        .map(|f| format!("{}{}{}", f.field, symbol(f.comparison), f.value))
        .collect();
    parts.sort();
    parts
}

fn symbol(c: Comparison) -> &'static str {
    match c {
        Comparison::Eq => "==",
        Comparison::Ne => "!=",
        Comparison::Lt => "<",
        Comparison::Le => "<=",
        Comparison::Gt => ">",
        Comparison::Ge => ">=",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cursor_codec::NullKms;
    use serde_json::json;
    use spec_model::route::Method;
    use spec_model::{Node, ProjectionTree, ResolvedRoute};
    use std::collections::HashMap;
    use storage_keystore::KeyStoreAdapter;

    fn keys_with_name() -> ProjectionTree {
        let mut tree = ProjectionTree::new();
        tree.insert(
            "id".to_string(),
            Node::Leaf {
                target: vec!["id".to_string()],
                required: false,
                ty: Some("string".to_string()),
                format: None,
            },
        );
        tree.insert(
            "name".to_string(),
            Node::Leaf {
                target: vec!["name".to_string()],
                required: true,
                ty: Some("string".to_string()),
                format: None,
            },
        );
        tree
    }

    fn ctx_for(method: Method, id_param: Option<&str>, path_params: HashMap<String, String>) -> RequestContext {
        let route = ResolvedRoute {
            table_name: Some("Widget".to_string()),
            table_id: Some("id".to_string()),
            keys: keys_with_name(),
            request_id: id_param.map(str::to_string),
            query_filters: vec![],
            forced_filters: vec![],
        };
        RequestContext::new(method, "/widgets/{id}", route, path_params, HashMap::new())
    }

    /// A list/page response schema's projection tree: `results` wraps the
    /// item shape rather than naming it directly.
    fn keys_wrapped_in_results() -> ProjectionTree {
        let mut tree = ProjectionTree::new();
        tree.insert(
            "results".to_string(),
            Node::Inner {
                target: vec!["results".to_string()],
                properties: keys_with_name(),
            },
        );
        tree
    }

    fn ctx_for_list(path_template: &str, keys: ProjectionTree) -> RequestContext {
        let route = ResolvedRoute {
            table_name: Some("Widget".to_string()),
            table_id: Some("id".to_string()),
            keys,
            request_id: None,
            query_filters: vec![],
            forced_filters: vec![],
        };
        RequestContext::new(Method::Get, path_template, route, HashMap::new(), HashMap::new())
    }

    #[tokio::test]
    async fn post_then_get_single_round_trips_through_generic_handler() {
        let adapter = Arc::new(KeyStoreAdapter::new(Arc::new(NullKms)));
        let handler = GenericHandler::new(adapter);
        let caller = CallerContext::default();

        let post_ctx = ctx_for(Method::Post, None, HashMap::new());
        let mut body = Entity::new();
        body.insert("name".to_string(), json!("bolt"));
        let created = handler.post_single(&post_ctx, &body).await.unwrap();
        let id = created["id"].as_str().unwrap().to_string();

        let mut path_params = HashMap::new();
        path_params.insert("id".to_string(), id.clone());
        let get_ctx = ctx_for(Method::Get, Some("id"), path_params);
        let fetched = handler.get_single(&get_ctx, &caller).await.unwrap().unwrap();
        assert_eq!(fetched["name"], json!("bolt"));
        assert_eq!(fetched["id"], json!(id));
    }

    #[tokio::test]
    async fn missing_entity_returns_none_not_error() {
        let adapter = Arc::new(KeyStoreAdapter::new(Arc::new(NullKms)));
        let handler = GenericHandler::new(adapter);
        let caller = CallerContext::default();
        let mut path_params = HashMap::new();
        path_params.insert("id".to_string(), "nope".to_string());
        let ctx = ctx_for(Method::Get, Some("id"), path_params);
        assert!(handler.get_single(&ctx, &caller).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unconfigured_route_is_config_incomplete() {
        let adapter = Arc::new(KeyStoreAdapter::new(Arc::new(NullKms)));
        let handler = GenericHandler::new(adapter);
        let caller = CallerContext::default();
        let route = ResolvedRoute {
            table_name: None,
            table_id: None,
            keys: ProjectionTree::new(),
            request_id: None,
            query_filters: vec![],
            forced_filters: vec![],
        };
        let ctx = RequestContext::new(Method::Get, "/widgets/{id}", route, HashMap::new(), HashMap::new());
        let err = handler.get_single(&ctx, &caller).await.unwrap_err();
        assert!(matches!(err, GatewayError::ConfigIncomplete(_)));
    }

    #[tokio::test]
    async fn get_multiple_projects_each_row_against_the_results_item_tree() {
        let adapter = Arc::new(KeyStoreAdapter::new(Arc::new(NullKms)));
        let handler = GenericHandler::new(adapter);
        let caller = CallerContext::default();

        let post_ctx = ctx_for(Method::Post, None, HashMap::new());
        let mut body = Entity::new();
        body.insert("name".to_string(), json!("bolt"));
        let created = handler.post_single(&post_ctx, &body).await.unwrap();
        let id = created["id"].as_str().unwrap().to_string();

        let list_ctx = ctx_for_list("/widgets", keys_wrapped_in_results());
        let rows = handler.get_multiple(&list_ctx, &caller).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], json!(id));
        assert_eq!(rows[0]["name"], json!("bolt"));
        assert!(rows[0].get("results").is_none());
    }

    #[tokio::test]
    async fn get_multiple_without_results_key_is_validation_failed() {
        let adapter = Arc::new(KeyStoreAdapter::new(Arc::new(NullKms)));
        let handler = GenericHandler::new(adapter);
        let caller = CallerContext::default();

        let list_ctx = ctx_for_list("/widgets", keys_with_name());
        let err = handler.get_multiple(&list_ctx, &caller).await.unwrap_err();
        assert!(matches!(err, GatewayError::ValidationFailed(msg) if msg.contains("results")));
    }

    #[tokio::test]
    async fn get_multiple_page_projects_each_row_against_the_results_item_tree() {
        let adapter = Arc::new(KeyStoreAdapter::new(Arc::new(NullKms)));
        let handler = GenericHandler::new(adapter);
        let caller = CallerContext::default();

        let post_ctx = ctx_for(Method::Post, None, HashMap::new());
        let mut body = Entity::new();
        body.insert("name".to_string(), json!("nut"));
        let created = handler.post_single(&post_ctx, &body).await.unwrap();
        let id = created["id"].as_str().unwrap().to_string();

        let list_ctx = ctx_for_list("/widgets/pages", keys_wrapped_in_results());
        let pagination = PaginationParams::default();
        let (items, _next, _prev) = handler
            .get_multiple_page(&list_ctx, &caller, &pagination, "https://example.test")
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["id"], json!(id));
        assert_eq!(items[0]["name"], json!("nut"));
    }
}
