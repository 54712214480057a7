//! Gateway configuration

use crate::routes::Upstream;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;
use std::time::Duration;
use thiserror::Error;

/// Problems that make a configuration unusable at startup
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    MissingSecret(&'static str),

    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),

    #[error("invalid {name} URL {url:?}: {reason}")]
    InvalidUpstreamUrl {
        name: &'static str,
        url: String,
        reason: String,
    },

    #[error("upstream timeout ({upstream}s) must be shorter than request timeout ({request}s)")]
    TimeoutTooLoose { upstream: u64, request: u64 },
}

/// Gateway server configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Driver service base URL
    pub driver_service_url: String,
    /// Passenger service base URL
    pub passenger_service_url: String,
    /// HS256 signing secret for bearer tokens
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    /// Shared secret expected in the `X-API-Key` header
    #[serde(skip_serializing)]
    pub api_key: String,
    /// Token refill rate (requests per second per client)
    pub rate_limit_rps: u32,
    /// Token bucket capacity per client
    pub rate_limit_burst: u32,
    /// Upper bound for a single upstream call (seconds)
    pub upstream_timeout_secs: u64,
    /// Upper bound for a whole inbound request (seconds)
    pub request_timeout_secs: u64,
    /// Maximum inbound body size buffered for forwarding (bytes)
    pub max_body_size: usize,
    /// Prefer `X-Forwarded-For` / `X-Real-IP` over the peer address
    pub trust_forwarded_for: bool,
    /// Interval for dropping idle limiter entries (0 disables the sweep)
    pub limiter_sweep_secs: u64,
    /// Answer CORS preflights at the gateway instead of proxying them
    pub cors_enabled: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            driver_service_url: "http://localhost:8081".to_string(),
            passenger_service_url: "http://localhost:8082".to_string(),
            jwt_secret: String::new(),
            api_key: String::new(),
            rate_limit_rps: 5,
            rate_limit_burst: 10,
            upstream_timeout_secs: 5,
            request_timeout_secs: 10,
            max_body_size: 10 * 1024 * 1024, // 10 MiB
            trust_forwarded_for: false,
            limiter_sweep_secs: 0,
            cors_enabled: false,
        }
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("driver_service_url", &self.driver_service_url)
            .field("passenger_service_url", &self.passenger_service_url)
            .field("jwt_secret", &"<redacted>")
            .field("api_key", &"<redacted>")
            .field("rate_limit_rps", &self.rate_limit_rps)
            .field("rate_limit_burst", &self.rate_limit_burst)
            .field("upstream_timeout_secs", &self.upstream_timeout_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_body_size", &self.max_body_size)
            .field("trust_forwarded_for", &self.trust_forwarded_for)
            .field("limiter_sweep_secs", &self.limiter_sweep_secs)
            .field("cors_enabled", &self.cors_enabled)
            .finish()
    }
}

impl GatewayConfig {
    /// Get the bind address
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Base URL for an upstream service
    pub fn upstream_url(&self, upstream: Upstream) -> &str {
        match upstream {
            Upstream::Driver => &self.driver_service_url,
            Upstream::Passenger => &self.passenger_service_url,
        }
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Rate-limit parameters as non-zero values
    pub fn rate_limit(&self) -> Result<(NonZeroU32, NonZeroU32), ConfigError> {
        let rate = NonZeroU32::new(self.rate_limit_rps)
            .ok_or(ConfigError::ZeroValue("rate_limit_rps"))?;
        let burst = NonZeroU32::new(self.rate_limit_burst)
            .ok_or(ConfigError::ZeroValue("rate_limit_burst"))?;
        Ok((rate, burst))
    }

    /// Strip trailing slashes so `base + path` never doubles them
    pub fn normalize(mut self) -> Self {
        for url in [&mut self.driver_service_url, &mut self.passenger_service_url] {
            let trimmed = url.trim_end_matches('/').len();
            url.truncate(trimmed);
        }
        self
    }

    /// Check everything that must hold before the gateway may start
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.is_empty() {
            return Err(ConfigError::MissingSecret("JWT_SECRET"));
        }
        if self.api_key.is_empty() {
            return Err(ConfigError::MissingSecret("API_KEY"));
        }

        self.rate_limit()?;

        if self.upstream_timeout_secs == 0 {
            return Err(ConfigError::ZeroValue("upstream_timeout_secs"));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ZeroValue("request_timeout_secs"));
        }
        if self.upstream_timeout_secs >= self.request_timeout_secs {
            return Err(ConfigError::TimeoutTooLoose {
                upstream: self.upstream_timeout_secs,
                request: self.request_timeout_secs,
            });
        }

        validate_upstream_url("DRIVER_SERVICE_URL", &self.driver_service_url)?;
        validate_upstream_url("PASSENGER_SERVICE_URL", &self.passenger_service_url)?;

        Ok(())
    }
}

fn validate_upstream_url(name: &'static str, raw: &str) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidUpstreamUrl {
        name,
        url: raw.to_string(),
        reason,
    };

    let parsed = url::Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    // Upstreams are plain HTTP services on the internal network
    if parsed.scheme() != "http" {
        return Err(invalid(format!("unsupported scheme {}", parsed.scheme())));
    }
    if parsed.query().is_some() || parsed.fragment().is_some() {
        return Err(invalid("base URL must not carry a query or fragment".to_string()));
    }
    Ok(())
}
