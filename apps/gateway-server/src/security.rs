//! Security-header and CORS middleware, layered the way the ingress stack
//! this gateway is descended from orders its layers: request-id plumbing
//! on the outside, tracing and timeouts in the middle, CORS and the
//! response-header hardening pass closest to the handler.

use axum::http::{HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use std::time::Duration;

const REQUEST_ID_HEADER: &str = "x-request-id";

pub fn request_id_layers() -> (PropagateRequestIdLayer, SetRequestIdLayer<MakeRequestUuid>) {
    let header = HeaderName::from_static(REQUEST_ID_HEADER);
    (
        PropagateRequestIdLayer::new(header.clone()),
        SetRequestIdLayer::new(header, MakeRequestUuid),
    )
}

pub fn trace_layer() -> TraceLayer<tower_http::classify::SharedClassifier<tower_http::classify::ServerErrorsAsFailures>> {
    TraceLayer::new_for_http()
}

pub fn timeout_layer() -> TimeoutLayer {
    TimeoutLayer::new(Duration::from_secs(30))
}

/// Builds the CORS layer from the `ORIGINS` whitelist. An empty list keeps
/// CORS off entirely rather than defaulting to wide-open, so a gateway has
/// to be deliberately opted into cross-origin use.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::new();
    }
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(parsed))
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}

/// Adds the response-hardening headers §6 specifies to every response. A
/// schema-driven gateway serves arbitrary tenant data, so this is applied
/// unconditionally rather than left to each route.
pub async fn security_headers(request: axum::extract::Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert("x-content-type-options", HeaderValue::from_static("nosniff"));
    headers.insert("x-frame-options", HeaderValue::from_static("SAMEORIGIN"));
    headers.insert(
        "referrer-policy",
        HeaderValue::from_static("no-referrer-when-downgrade"),
    );
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'self'; script-src 'self'; style-src 'self' 'unsafe-inline'"),
    );
    // §6 names the legacy `Feature-Policy` header; `Permissions-Policy` is
    // its modern successor. Both are emitted so the response matches the
    // spec's literal wording while still working in current browsers.
    headers.insert(
        "feature-policy",
        HeaderValue::from_static(
            "camera 'none'; microphone 'none'; geolocation 'none'; payment 'none'; usb 'none'",
        ),
    );
    headers.insert(
        "permissions-policy",
        HeaderValue::from_static("camera=(), microphone=(), geolocation=(), payment=(), usb=()"),
    );
    response
}

