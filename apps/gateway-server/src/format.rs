//! `Accept`-header content negotiation: JSON is the default and is handled
//! directly; CSV and the explicitly-unsupported export formats go through
//! the `ContentFormatter` seam from `gateway_core`. By the time a response
//! reaches this module, `spec_model::route::resolve_route` has already
//! rejected any `Accept` type absent from the operation's declared response
//! content-types (400 `ContentTypeNegotiationFailed`); a type that *is*
//! declared but that this module has no renderer for is a distinct failure
//! (501 `FormatUnsupported`), not a silent fall-through to JSON.

use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use gateway_core::{ContentFormatter, CsvFormatter, UnsupportedFormatter};
use gateway_errors::GatewayError;
use serde_json::Value as Json;

pub fn negotiate(headers: &HeaderMap, entities: &[Json]) -> Result<Response, GatewayError> {
    let accept = headers
        .get(axum::http::header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/json")
        .trim();

    if accept.is_empty() || accept.contains("application/json") || accept.contains("*/*") {
        return Ok(axum::Json(entities).into_response());
    }
    if accept.contains("text/csv") {
        return render_with(&CsvFormatter, entities);
    }
    if accept.contains("application/vnd.ms-excel") || accept.contains("spreadsheetml") {
        return render_with(&UnsupportedFormatter { name: "xlsx" }, entities);
    }
    if accept.contains("application/pdf") {
        return render_with(&UnsupportedFormatter { name: "pdf" }, entities);
    }

    Err(GatewayError::FormatUnsupported(accept.to_string()))
}

fn render_with(formatter: &dyn ContentFormatter, entities: &[Json]) -> Result<Response, GatewayError> {
    let body = formatter
        .format(entities)
        .map_err(|_| GatewayError::FormatUnsupported(formatter.content_type().to_string()))?;

    let mut response = (StatusCode::OK, body).into_response();
    if let Ok(value) = HeaderValue::from_str(formatter.content_type()) {
        response.headers_mut().insert(axum::http::header::CONTENT_TYPE, value);
    }
    Ok(response)
}
