//! Application state

use crate::auth::CredentialGate;
use crate::config::GatewayConfig;
use crate::limiter::ClientLimiter;
use crate::proxy::ForwardingProxy;
use crate::routes::RouteTable;
use std::sync::Arc;
use tracing::info;

/// Application state shared across handlers
pub struct AppState {
    /// Gateway configuration
    pub config: GatewayConfig,
    /// Per-client token buckets
    pub limiter: Arc<ClientLimiter>,
    /// Bearer token and API key checks
    pub credentials: CredentialGate,
    /// Upstream HTTP client
    pub proxy: ForwardingProxy,
    /// Prefix → upstream table
    pub routes: RouteTable,
}

impl AppState {
    /// Create a new application state
    pub fn new(config: GatewayConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let limiter = Arc::new(ClientLimiter::from_config(&config)?);
        Self::with_limiter(config, limiter)
    }

    /// Create state around an existing limiter
    pub fn with_limiter(config: GatewayConfig, limiter: Arc<ClientLimiter>) -> anyhow::Result<Self> {
        let config = config.normalize();
        config.validate()?;

        let credentials = CredentialGate::new(&config.jwt_secret, config.api_key.clone());
        let proxy = ForwardingProxy::new(config.upstream_timeout(), config.max_body_size);
        let routes = RouteTable::default();

        for route in routes.routes() {
            info!(
                prefix = route.prefix,
                upstream = route.upstream.name(),
                url = config.upstream_url(route.upstream),
                protected = route.protected,
                "Registered route"
            );
        }
        info!(
            rate = limiter.rate().get(),
            burst = limiter.burst().get(),
            "Per-client rate limit"
        );

        Ok(Self {
            config,
            limiter,
            credentials,
            proxy,
            routes,
        })
    }
}
