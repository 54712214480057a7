//! Proxy pipeline for the upstream record services

use crate::{AppState, GatewayError};
use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::debug;

/// Any method, any path not claimed by another route.
///
/// Resolves the upstream from the prefix table, applies the credential gate
/// on protected routes, then relays the request. Runs after the rate limiter.
pub async fn proxy_request(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
) -> Result<Response, GatewayError> {
    let route = state
        .routes
        .resolve(request.uri().path())
        .ok_or(GatewayError::RouteNotFound)?;

    if route.protected {
        let claims = state.credentials.check(request.headers())?;
        debug!(
            subject = claims.sub.as_deref().unwrap_or("-"),
            upstream = route.upstream.name(),
            "Credentials accepted"
        );
    }

    let base_url = state.config.upstream_url(route.upstream);
    let upstream = state.proxy.forward(request, base_url).await?;

    Ok(upstream.into_response())
}
