//! Builds the axum `Router` by walking every path object the loaded
//! OpenAPI document declares and registering a route per HTTP method
//! present, all pointing at the same generic handlers. No per-route code
//! is ever written here — only route *registration*.

use axum::http::StatusCode;
use axum::middleware;
use axum::routing::{get, post, put};
use axum::Router;
use serde_yaml::Value;
use spec_model::normalize_path_template;

use crate::handlers::{handle_get, handle_post, handle_put};
use crate::security;
use crate::state::AppState;

pub fn build(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/healthz", get(healthz))
        .route("/openapi.json", get(openapi_json));

    if let Some(paths) = state.spec.paths().and_then(Value::as_mapping) {
        for (raw_path, path_object) in paths {
            let Some(raw_path) = raw_path.as_str() else { continue };
            let template = normalize_path_template(raw_path);

            let mut method_router: Option<axum::routing::MethodRouter<AppState>> = None;
            if path_object.get("get").is_some() {
                method_router = Some(get(handle_get));
            }
            if path_object.get("post").is_some() {
                method_router = Some(match method_router {
                    Some(mr) => mr.post(handle_post),
                    None => post(handle_post),
                });
            }
            if path_object.get("put").is_some() {
                method_router = Some(match method_router {
                    Some(mr) => mr.put(handle_put),
                    None => put(handle_put),
                });
            }
            if path_object.get("patch").is_some() {
                method_router = Some(match method_router {
                    Some(mr) => mr.patch(handle_put),
                    None => axum::routing::patch(handle_put),
                });
            }

            if let Some(method_router) = method_router {
                router = router.route(&template, method_router);
            }
        }
    }

    let (propagate_request_id, set_request_id) = security::request_id_layers();
    let cors = security::cors_layer(&state.cors_origins);

    router
        .layer(middleware::from_fn(security::security_headers))
        .layer(cors)
        .layer(security::timeout_layer())
        .layer(security::trace_layer())
        .layer(propagate_request_id)
        .layer(set_request_id)
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn openapi_json(axum::extract::State(state): axum::extract::State<AppState>) -> axum::Json<serde_json::Value> {
    let as_json = serde_json::to_value(state.spec.root()).unwrap_or(serde_json::Value::Null);
    axum::Json(as_json)
}
