//! Request forwarding to the upstream record services

use crate::GatewayError;
use axum::{
    body::{to_bytes, Body},
    http::{header, request::Parts, HeaderMap, HeaderValue, Method, Request, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

/// Content type used when the upstream does not send one
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Headers scoped to a single connection; the HTTP client and server
/// recompute them, so they are never copied across the proxy.
fn is_connection_header(name: &header::HeaderName) -> bool {
    matches!(
        name.as_str(),
        "host"
            | "connection"
            | "keep-alive"
            | "proxy-connection"
            | "transfer-encoding"
            | "te"
            | "trailer"
            | "upgrade"
            | "content-length"
    )
}

/// Copy a header set, keeping every value of multi-valued headers
fn copy_headers(source: &HeaderMap) -> HeaderMap {
    let mut copied = HeaderMap::with_capacity(source.len());
    for (name, value) in source {
        if !is_connection_header(name) {
            copied.append(name.clone(), value.clone());
        }
    }
    copied
}

/// Everything needed to issue one outbound call
#[derive(Debug, Clone)]
pub struct ForwardDescriptor {
    pub method: Method,
    pub target: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ForwardDescriptor {
    /// Describe the outbound equivalent of an inbound request
    pub fn new(base_url: &str, parts: &Parts, body: Bytes) -> Self {
        Self {
            method: parts.method.clone(),
            target: Self::target_url(base_url, &parts.uri),
            headers: copy_headers(&parts.headers),
            body,
        }
    }

    /// `base + path`, plus the raw query string when there is one
    pub fn target_url(base_url: &str, uri: &Uri) -> String {
        match uri.query() {
            Some(query) => format!("{}{}?{}", base_url, uri.path(), query),
            None => format!("{}{}", base_url, uri.path()),
        }
    }
}

/// Successful upstream exchange, relayed back to the caller as-is
#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Result of one forward: the relayed response or a gateway-level error
pub type UpstreamOutcome = Result<UpstreamResponse, GatewayError>;

impl IntoResponse for UpstreamResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// Outbound HTTP/1 client. It writes the request target exactly as given.
type UpstreamClient = Client<HttpConnector, Full<Bytes>>;

/// HTTP client wrapper that relays requests to a chosen upstream
#[derive(Clone, Debug)]
pub struct ForwardingProxy {
    client: UpstreamClient,
    timeout: Duration,
    max_body_size: usize,
}

impl ForwardingProxy {
    pub fn new(timeout: Duration, max_body_size: usize) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(timeout));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            client,
            timeout,
            max_body_size,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Forward an inbound request to `base_url` and collect the upstream reply.
    ///
    /// The call lives inside the caller's future: dropping it (client gone,
    /// request deadline hit) aborts the upstream call as well.
    pub async fn forward(&self, request: Request<Body>, base_url: &str) -> UpstreamOutcome {
        let (parts, body) = request.into_parts();

        let body = to_bytes(body, self.max_body_size).await.map_err(|e| {
            warn!(error = %e, "Failed to read request body");
            GatewayError::internal("failed to read request body")
        })?;

        self.send(ForwardDescriptor::new(base_url, &parts, body)).await
    }

    /// Issue the outbound call described by `descriptor`.
    ///
    /// One deadline covers both the response head and the body.
    pub async fn send(&self, descriptor: ForwardDescriptor) -> UpstreamOutcome {
        let ForwardDescriptor {
            method,
            target,
            headers,
            body,
        } = descriptor;

        let uri = target
            .parse::<Uri>()
            .ok()
            .filter(|uri| uri.scheme().is_some() && uri.authority().is_some())
            .ok_or_else(|| {
                warn!(target = %target, "Failed to build upstream URI");
                GatewayError::malformed("failed to create proxy request")
            })?;

        let mut outbound = Request::new(Full::new(body));
        *outbound.method_mut() = method.clone();
        *outbound.uri_mut() = uri;
        *outbound.headers_mut() = headers;

        debug!(method = %method, target = %target, "Forwarding request");

        let deadline = Instant::now() + self.timeout;

        let upstream = match timeout_at(deadline, self.client.request(outbound)).await {
            Ok(Ok(upstream)) => upstream,
            Ok(Err(e)) => {
                warn!(
                    target = %target,
                    connect = e.is_connect(),
                    error = %e,
                    "Upstream request failed"
                );
                return Err(GatewayError::UpstreamUnreachable);
            }
            Err(_) => {
                warn!(target = %target, timeout = ?self.timeout, "Upstream request timed out");
                return Err(GatewayError::UpstreamUnreachable);
            }
        };

        let (head, upstream_body) = upstream.into_parts();
        let body = match timeout_at(deadline, upstream_body.collect()).await {
            Ok(Ok(collected)) => collected.to_bytes(),
            Ok(Err(e)) => {
                warn!(target = %target, error = %e, "Failed to read upstream response");
                return Err(GatewayError::internal("failed to read upstream response"));
            }
            Err(_) => {
                warn!(target = %target, "Timed out reading upstream response");
                return Err(GatewayError::internal("failed to read upstream response"));
            }
        };

        let mut headers = copy_headers(&head.headers);
        if !headers.contains_key(header::CONTENT_TYPE) {
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static(DEFAULT_CONTENT_TYPE),
            );
        }

        Ok(UpstreamResponse {
            status: head.status,
            headers,
            body,
        })
    }
}
