//! Axum glue: pulls the matched route template, path/query params, and
//! caller identity out of the request, hands them to the generic handler,
//! and converts the result (or error) into an HTTP response.

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::{MatchedPath, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use gateway_core::PaginationParams;
use gateway_errors::{GatewayError, ProblemResponse};
use serde_json::Value as Json_;
use spec_model::route::Method as RouteMethod;
use spec_model::{resolve_route, RequestContext};
use storage_core::PageAction;

use crate::format::negotiate;
use crate::state::AppState;

fn to_problem(err: GatewayError, instance: &str) -> ProblemResponse {
    let ProblemResponse(mut problem) = ProblemResponse::from(err);
    problem.instance = instance.to_string();
    ProblemResponse(problem)
}

async fn build_context(
    state: &AppState,
    method: RouteMethod,
    matched_path: &str,
    path_params: HashMap<String, String>,
    query_params: HashMap<String, String>,
    accept: &str,
) -> Result<RequestContext, GatewayError> {
    let route = resolve_route(&state.spec, matched_path, &method, accept)?
        .ok_or_else(|| GatewayError::RouteUnknown(matched_path.to_string()))?;
    Ok(RequestContext::new(method, matched_path, route, path_params, query_params))
}

fn accept_header(headers: &HeaderMap) -> &str {
    headers
        .get(axum::http::header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

fn caller_headers(headers: &HeaderMap) -> (Option<String>, Option<String>) {
    let upn = headers
        .get("x-upn")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let ip = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    (upn, ip)
}

fn is_page_route(matched_path: &str) -> bool {
    matched_path
        .trim_end_matches('/')
        .split('/')
        .any(|seg| seg == "pages")
}

pub async fn handle_get(
    State(state): State<AppState>,
    matched_path: MatchedPath,
    Path(path_params): Path<HashMap<String, String>>,
    Query(query_params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let template = matched_path.as_str();
    let accept = accept_header(&headers).to_string();
    let ctx = match build_context(&state, RouteMethod::Get, template, path_params, query_params.clone(), &accept).await {
        Ok(ctx) => ctx,
        Err(err) => return to_problem(err, template).into_response(),
    };

    let (upn, header_ip) = caller_headers(&headers);
    let caller = state.identity.resolve(upn.as_deref(), header_ip.as_deref()).await;

    if is_page_route(template) {
        let pagination = PaginationParams {
            cursor: query_params.get("page_cursor").cloned(),
            size: query_params
                .get("page_size")
                .and_then(|v| v.parse().ok())
                .unwrap_or(50),
            action: query_params
                .get("page_action")
                .map(|v| PageAction::from_str(v))
                .unwrap_or(PageAction::Next),
        };

        let base_url = base_url(&state, &headers);
        return match state
            .handler
            .get_multiple_page(&ctx, &caller, &pagination, &base_url)
            .await
        {
            Ok((items, _, _)) if items.is_empty() => {
                (StatusCode::NO_CONTENT, Json(Json_::Array(Vec::new()))).into_response()
            }
            Ok((items, next_page, prev_page)) => {
                render_page(items, pagination.size, next_page, prev_page, &headers)
            }
            Err(err) => to_problem(err, template).into_response(),
        };
    }

    if ctx.entity_id().is_some() {
        return match state.handler.get_single(&ctx, &caller).await {
            Ok(Some(entity)) => render_single(entity, &headers),
            Ok(None) => to_problem(GatewayError::NotFound, template).into_response(),
            Err(err) => to_problem(err, template).into_response(),
        };
    }

    match state.handler.get_multiple(&ctx, &caller).await {
        Ok(items) if items.is_empty() => {
            (StatusCode::NO_CONTENT, Json(Json_::Array(Vec::new()))).into_response()
        }
        Ok(items) => render_collection(items, &headers),
        Err(err) => to_problem(err, template).into_response(),
    }
}

pub async fn handle_post(
    State(state): State<AppState>,
    matched_path: MatchedPath,
    Path(path_params): Path<HashMap<String, String>>,
    Query(query_params): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    let template = matched_path.as_str();
    let ctx = match build_context(&state, RouteMethod::Post, template, path_params, query_params, "").await {
        Ok(ctx) => ctx,
        Err(err) => return to_problem(err, template).into_response(),
    };

    let entity = match parse_body(&body) {
        Ok(e) => e,
        Err(err) => return to_problem(err, template).into_response(),
    };

    match state.handler.post_single(&ctx, &entity).await {
        Ok(entity) => (StatusCode::CREATED, Json(entity)).into_response(),
        Err(err) => to_problem(err, template).into_response(),
    }
}

pub async fn handle_put(
    State(state): State<AppState>,
    matched_path: MatchedPath,
    Path(path_params): Path<HashMap<String, String>>,
    Query(query_params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let template = matched_path.as_str();
    let ctx = match build_context(&state, RouteMethod::Put, template, path_params, query_params, "").await {
        Ok(ctx) => ctx,
        Err(err) => return to_problem(err, template).into_response(),
    };

    let (upn, header_ip) = caller_headers(&headers);
    let caller = state.identity.resolve(upn.as_deref(), header_ip.as_deref()).await;

    let entity = match parse_body(&body) {
        Ok(e) => e,
        Err(err) => return to_problem(err, template).into_response(),
    };

    match state.handler.put_single(&ctx, &caller, &entity).await {
        Ok(Some(entity)) => (StatusCode::OK, Json(entity)).into_response(),
        Ok(None) => to_problem(GatewayError::NotFound, template).into_response(),
        Err(err) => to_problem(err, template).into_response(),
    }
}

fn parse_body(body: &[u8]) -> Result<entity::Entity, GatewayError> {
    serde_json::from_slice(body).map_err(|e| GatewayError::ValidationFailed(e.to_string()))
}

/// A single fetched entity is always its own JSON object on the default
/// (and unspecified-`Accept`) path; only an explicit non-JSON `Accept`
/// routes it through the list-shaped `ContentFormatter` seam.
fn render_single(entity: Json_, headers: &HeaderMap) -> Response {
    let accept = headers
        .get(axum::http::header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/json");
    if accept.contains("application/json") || accept.trim().is_empty() {
        return (StatusCode::OK, Json(entity)).into_response();
    }
    render_collection(vec![entity], headers)
}

/// A list of entities goes through content negotiation: JSON is passed
/// through as an array, csv/xlsx/pdf are delegated to `ContentFormatter`.
fn render_collection(entities: Vec<Json_>, headers: &HeaderMap) -> Response {
    match negotiate(headers, &entities) {
        Ok(response) => response,
        Err(err) => to_problem(err, "").into_response(),
    }
}

/// Paginated responses are always the JSON envelope the storage-adapter
/// contract describes (`{results, status, page_size, next_page, prev_page}`),
/// never content-negotiated — pagination is a JSON-only surface.
fn render_page(
    items: Vec<Json_>,
    page_size: u32,
    next_page: Option<String>,
    prev_page: Option<String>,
    _headers: &HeaderMap,
) -> Response {
    let mut body = serde_json::Map::new();
    body.insert("results".to_string(), Json_::Array(items));
    body.insert("status".to_string(), Json_::String("success".to_string()));
    body.insert("page_size".to_string(), Json_::from(page_size));
    if let Some(next) = next_page {
        body.insert("next_page".to_string(), Json_::String(next));
    }
    if let Some(prev) = prev_page {
        body.insert("prev_page".to_string(), Json_::String(prev));
    }
    (StatusCode::OK, Json(Json_::Object(body))).into_response()
}

/// `BASE_URL` overrides the host entirely when configured; otherwise the
/// host is derived from the request and the scheme is forced to `https`,
/// per §6, since the gateway normally sits behind a TLS-terminating proxy.
fn base_url(state: &AppState, headers: &HeaderMap) -> String {
    if let Some(base) = &state.base_url {
        return base.trim_end_matches('/').to_string();
    }
    headers
        .get(axum::http::header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(|host| format!("https://{host}"))
        .unwrap_or_else(|| "https://localhost".to_string())
}
