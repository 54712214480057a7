//! HTTP middleware for rate limiting, request ids and request logging

use crate::{AppState, GatewayError};
use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

/// Header carrying the per-request id on every gateway response
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Key used when no client address can be determined
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Resolve the rate-limit key for a request.
///
/// The TCP peer address is used unless `trust_forwarded_for` is set, in which
/// case the first `X-Forwarded-For` entry (or `X-Real-IP`) wins.
pub fn client_key(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_forwarded_for: bool,
) -> String {
    if trust_forwarded_for {
        if let Some(ip) = forwarded_ip(headers) {
            return ip.to_string();
        }
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let from_xff = headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|first| first.trim().parse().ok());

    from_xff.or_else(|| {
        headers
            .get("x-real-ip")
            .and_then(|h| h.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
    })
}

/// Rate limiting middleware.
///
/// Runs before any credential check so abusive traffic is rejected as
/// cheaply as possible.
pub async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, GatewayError> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let key = client_key(request.headers(), peer, state.config.trust_forwarded_for);

    if !state.limiter.allow(&key) {
        tracing::debug!(client = %key, "Rate limit exceeded");
        return Err(GatewayError::RateLimited);
    }

    Ok(next.run(request).await)
}

/// Request ID middleware - adds x-request-id header
pub async fn request_id_middleware(mut request: Request<Body>, next: Next) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();
    request.extensions_mut().insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Request ID extension
#[derive(Clone, Debug)]
pub struct RequestId(pub String);

/// Logging middleware
pub async fn logging_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default();
    let start = std::time::Instant::now();

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status();

    tracing::info!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        status = %status.as_u16(),
        duration_ms = %duration.as_millis(),
        "Request completed"
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> Option<SocketAddr> {
        Some("192.0.2.10:53211".parse().unwrap())
    }

    #[test]
    fn test_client_key_uses_peer_ip() {
        let headers = HeaderMap::new();
        assert_eq!(client_key(&headers, peer(), false), "192.0.2.10");
        assert_eq!(client_key(&headers, None, false), UNKNOWN_CLIENT);
    }

    #[test]
    fn test_forwarded_for_ignored_unless_trusted() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "198.51.100.1, 10.0.0.1".parse().unwrap());

        assert_eq!(client_key(&headers, peer(), false), "192.0.2.10");
        assert_eq!(client_key(&headers, peer(), true), "198.51.100.1");
    }

    #[test]
    fn test_real_ip_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "garbage".parse().unwrap());
        headers.insert("x-real-ip", "2001:db8::1".parse().unwrap());

        assert_eq!(client_key(&headers, peer(), true), "2001:db8::1");
    }

    #[test]
    fn test_port_is_not_part_of_key() {
        let headers = HeaderMap::new();
        let a = client_key(&headers, Some("192.0.2.10:1000".parse().unwrap()), false);
        let b = client_key(&headers, Some("192.0.2.10:2000".parse().unwrap()), false);
        assert_eq!(a, b);
    }
}
