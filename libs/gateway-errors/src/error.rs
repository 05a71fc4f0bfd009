use crate::problem::{Problem, ProblemResponse};
use axum::http::StatusCode;

/// Unified error type raised anywhere in the dispatch engine.
///
/// Mirrors the error-kind table of the dispatch engine: parsers and filters
/// raise these directly, adapters translate storage failures into them, and
/// `GenericHandler` is the single site that converts a `GatewayError` into an
/// HTTP response.
#[derive(thiserror::Error, Debug, Clone)]
pub enum GatewayError {
    #[error("config incomplete: {0}")]
    ConfigIncomplete(String),

    #[error("route unknown: {0}")]
    RouteUnknown(String),

    #[error("validation failed: {0}")]
    ValidationFailed(String),

    #[error("content-type negotiation failed: {0}")]
    ContentTypeNegotiationFailed(String),

    #[error("not found")]
    NotFound,

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("bad cursor: {0}")]
    BadCursor(String),

    #[error("format not supported: {0}")]
    FormatUnsupported(String),

    #[error("identity rejected: {0}")]
    IdentityRejected(String),
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::ConfigIncomplete(_) | GatewayError::RouteUnknown(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            GatewayError::ValidationFailed(_)
            | GatewayError::ContentTypeNegotiationFailed(_)
            | GatewayError::BadCursor(_) => StatusCode::BAD_REQUEST,
            GatewayError::NotFound => StatusCode::NOT_FOUND,
            GatewayError::Unauthorized(_) | GatewayError::IdentityRejected(_) => {
                StatusCode::UNAUTHORIZED
            }
            GatewayError::FormatUnsupported(_) => StatusCode::NOT_IMPLEMENTED,
        }
    }

    fn title(&self) -> &'static str {
        match self {
            GatewayError::ConfigIncomplete(_) => "Internal Server Error",
            GatewayError::RouteUnknown(_) => "Internal Server Error",
            GatewayError::ValidationFailed(_) => "Bad Request",
            GatewayError::ContentTypeNegotiationFailed(_) => "Bad Request",
            GatewayError::BadCursor(_) => "Bad Request",
            GatewayError::NotFound => "Not Found",
            GatewayError::Unauthorized(_) => "Unauthorized",
            GatewayError::IdentityRejected(_) => "Unauthorized",
            GatewayError::FormatUnsupported(_) => "Not Implemented",
        }
    }

    fn detail(&self) -> String {
        match self {
            GatewayError::NotFound => "Not found".to_string(),
            GatewayError::ConfigIncomplete(msg)
            | GatewayError::RouteUnknown(msg)
            | GatewayError::ValidationFailed(msg)
            | GatewayError::ContentTypeNegotiationFailed(msg)
            | GatewayError::BadCursor(msg)
            | GatewayError::Unauthorized(msg)
            | GatewayError::IdentityRejected(msg)
            | GatewayError::FormatUnsupported(msg) => msg.clone(),
        }
    }
}

impl From<GatewayError> for Problem {
    fn from(e: GatewayError) -> Self {
        Problem::new(e.status_code(), e.title(), e.detail())
    }
}

impl From<GatewayError> for ProblemResponse {
    fn from(e: GatewayError) -> Self {
        Problem::from(e).into()
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
