//! Gateway error types and their HTTP mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Header carrying the machine-readable error code on gateway-originated errors
pub const ERROR_CODE_HEADER: &str = "x-gateway-error-code";

/// Gateway error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    RateLimited,
    Unauthorized,
    RouteNotFound,
    MalformedRequest,
    UpstreamUnreachable,
    GatewayInternal,
}

impl ErrorCode {
    /// Get the error code string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RateLimited => "RateLimited",
            Self::Unauthorized => "Unauthorized",
            Self::RouteNotFound => "RouteNotFound",
            Self::MalformedRequest => "MalformedRequest",
            Self::UpstreamUnreachable => "UpstreamUnreachable",
            Self::GatewayInternal => "GatewayInternal",
        }
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::RouteNotFound => StatusCode::NOT_FOUND,
            Self::MalformedRequest => StatusCode::BAD_REQUEST,
            Self::UpstreamUnreachable => StatusCode::BAD_GATEWAY,
            Self::GatewayInternal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether a caller may reasonably retry the same request later
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::UpstreamUnreachable | Self::GatewayInternal
        )
    }
}

/// Terminal outcomes produced by the gateway itself.
///
/// None of these are retried internally; each maps to exactly one status and
/// a `{"error": "..."}` body.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("too many requests")]
    RateLimited,

    #[error("{0}")]
    Unauthorized(String),

    #[error("route not found")]
    RouteNotFound,

    #[error("{0}")]
    MalformedRequest(String),

    #[error("upstream service unreachable")]
    UpstreamUnreachable,

    #[error("{0}")]
    GatewayInternal(String),
}

impl GatewayError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedRequest(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::GatewayInternal(message.into())
    }

    /// Get the error code
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::RateLimited => ErrorCode::RateLimited,
            Self::Unauthorized(_) => ErrorCode::Unauthorized,
            Self::RouteNotFound => ErrorCode::RouteNotFound,
            Self::MalformedRequest(_) => ErrorCode::MalformedRequest,
            Self::UpstreamUnreachable => ErrorCode::UpstreamUnreachable,
            Self::GatewayInternal(_) => ErrorCode::GatewayInternal,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let code = self.error_code();

        (
            code.status_code(),
            [(ERROR_CODE_HEADER, code.as_str())],
            Json(json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}
