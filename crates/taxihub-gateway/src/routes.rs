//! HTTP route definitions

use crate::{handlers, middleware, AppState, GatewayError};
use axum::{
    error_handling::HandleErrorLayer, middleware as axum_middleware, routing::get, BoxError,
    Router,
};
use std::sync::Arc;
use tower::{
    timeout::{error::Elapsed, TimeoutLayer},
    ServiceBuilder,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Backend record services reachable through the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Upstream {
    Driver,
    Passenger,
}

impl Upstream {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Driver => "driver-service",
            Self::Passenger => "passenger-service",
        }
    }
}

/// One entry of the static prefix table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub prefix: &'static str,
    pub upstream: Upstream,
    /// Whether the credential gate applies
    pub protected: bool,
}

impl Route {
    /// Exact prefix, or prefix followed by a path segment
    fn matches(&self, path: &str) -> bool {
        match path.strip_prefix(self.prefix) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

/// Prefix → upstream table, fixed for the lifetime of the process
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new(vec![
            Route {
                prefix: "/drivers",
                upstream: Upstream::Driver,
                protected: true,
            },
            Route {
                prefix: "/passengers",
                upstream: Upstream::Passenger,
                protected: true,
            },
        ])
    }
}

impl RouteTable {
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    /// First route whose prefix matches `path`
    pub fn resolve(&self, path: &str) -> Option<&Route> {
        self.routes.iter().find(|route| route.matches(path))
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}

/// Create the main router.
///
/// Every request passes the rate limiter first, including CORS preflights;
/// `/health` is answered directly, everything else goes through the proxy
/// pipeline. A request that outlives `request_timeout` gets a JSON error.
pub fn create_router(state: Arc<AppState>) -> Router {
    let router = Router::new()
        .route("/health", get(handlers::health_check))
        .fallback(handlers::proxy_request);

    let router = if state.config.cors_enabled {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
                .expose_headers(Any),
        )
    } else {
        router
    };

    router
        .layer(axum_middleware::from_fn_with_state(
            Arc::clone(&state),
            middleware::rate_limit_middleware,
        ))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_timeout_error))
                .layer(TimeoutLayer::new(state.config.request_timeout())),
        )
        .layer(axum_middleware::from_fn(middleware::logging_middleware))
        .layer(axum_middleware::from_fn(middleware::request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn handle_timeout_error(err: BoxError) -> GatewayError {
    if err.is::<Elapsed>() {
        tracing::warn!("Request deadline exceeded");
        GatewayError::internal("request timed out")
    } else {
        GatewayError::internal(format!("unhandled internal error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GatewayConfig;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use rstest::rstest;
    use tower::ServiceExt;

    fn config(rate: u32, burst: u32) -> GatewayConfig {
        GatewayConfig {
            jwt_secret: "jwtsecret123".to_string(),
            api_key: "apikey123".to_string(),
            // Nothing listens here; requests that reach the proxy get a 502
            driver_service_url: "http://127.0.0.1:1".to_string(),
            passenger_service_url: "http://127.0.0.1:1".to_string(),
            rate_limit_rps: rate,
            rate_limit_burst: burst,
            ..Default::default()
        }
    }

    fn app_with(config: GatewayConfig) -> Router {
        create_router(Arc::new(AppState::new(config).unwrap()))
    }

    fn app(rate: u32, burst: u32) -> Router {
        app_with(config(rate, burst))
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn preflight(uri: &str) -> Request<Body> {
        Request::builder()
            .method("OPTIONS")
            .uri(uri)
            .header("origin", "https://dispatch.example")
            .header("access-control-request-method", "POST")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_skips_credentials() {
        let response = app(100, 100).oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(middleware::REQUEST_ID_HEADER));
    }

    #[tokio::test]
    async fn test_unmatched_path_is_not_found_without_credentials() {
        let response = app(100, 100).oneshot(get("/driversX")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_protected_route_requires_credentials() {
        let response = app(100, 100).oneshot(get("/drivers")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_rate_limit_applies_to_every_route() {
        let app = app(1, 2);
        for _ in 0..2 {
            let response = app.clone().oneshot(get("/health")).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app.clone().oneshot(get("/drivers")).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let response = app.oneshot(get("/nowhere")).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_preflights_count_against_rate_limit() {
        let app = app_with(GatewayConfig {
            cors_enabled: true,
            ..config(1, 1)
        });

        let response = app.clone().oneshot(preflight("/drivers")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response
            .headers()
            .contains_key("access-control-allow-origin"));

        let response = app.oneshot(preflight("/drivers")).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_options_goes_through_pipeline_without_cors() {
        let app = app(100, 100);
        let response = app.oneshot(preflight("/drivers")).await.unwrap();

        // Treated like any other method on a protected route
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(!response
            .headers()
            .contains_key("access-control-allow-origin"));
    }

    #[rstest]
    #[case("/drivers", Some(Upstream::Driver))]
    #[case("/drivers/", Some(Upstream::Driver))]
    #[case("/drivers/nearby", Some(Upstream::Driver))]
    #[case("/drivers/65f1c0ffee/location", Some(Upstream::Driver))]
    #[case("/passengers", Some(Upstream::Passenger))]
    #[case("/passengers/nearby", Some(Upstream::Passenger))]
    #[case("/driversX", None)]
    #[case("/passengersnearby", None)]
    #[case("/health", None)]
    #[case("/", None)]
    #[case("/api/drivers", None)]
    fn test_resolve(#[case] path: &str, #[case] expected: Option<Upstream>) {
        let table = RouteTable::default();
        assert_eq!(table.resolve(path).map(|r| r.upstream), expected);
    }

    #[test]
    fn test_default_routes_are_protected() {
        let table = RouteTable::default();
        assert_eq!(table.routes().len(), 2);
        assert!(table.routes().iter().all(|r| r.protected));
    }

    #[test]
    fn test_upstream_names() {
        assert_eq!(Upstream::Driver.name(), "driver-service");
        assert_eq!(Upstream::Passenger.name(), "passenger-service");
    }
}
