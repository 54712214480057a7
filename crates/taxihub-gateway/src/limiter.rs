//! Per-client token buckets

use crate::config::{ConfigError, GatewayConfig};
use governor::{clock::DefaultClock, state::keyed::DefaultKeyedStateStore, Quota, RateLimiter};
use std::num::NonZeroU32;

/// Rate limiter type
pub type KeyedRateLimiter =
    RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// One token bucket per client key, created on first sight.
///
/// Each bucket starts full (`burst` tokens) and refills at `rate` tokens per
/// second up to `burst`. The keyed store does an atomic get-or-insert, and
/// the consume step is a single compare-and-swap on that bucket's state, so
/// concurrent calls for the same key never create two buckets or lose an
/// update.
pub struct ClientLimiter {
    limiter: KeyedRateLimiter,
    rate: NonZeroU32,
    burst: NonZeroU32,
}

impl ClientLimiter {
    pub fn new(rate_per_second: NonZeroU32, burst: NonZeroU32) -> Self {
        let quota = Quota::per_second(rate_per_second).allow_burst(burst);
        Self {
            limiter: RateLimiter::keyed(quota),
            rate: rate_per_second,
            burst,
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Result<Self, ConfigError> {
        let (rate, burst) = config.rate_limit()?;
        Ok(Self::new(rate, burst))
    }

    /// Try to take one token for `client_key`
    pub fn allow(&self, client_key: &str) -> bool {
        self.limiter.check_key(&client_key.to_string()).is_ok()
    }

    /// Number of clients currently tracked
    pub fn len(&self) -> usize {
        self.limiter.len()
    }

    pub fn is_empty(&self) -> bool {
        self.limiter.is_empty()
    }

    /// Drop buckets that have refilled completely.
    ///
    /// A full bucket behaves exactly like a freshly created one, so this only
    /// reclaims memory.
    pub fn sweep_idle(&self) {
        let before = self.limiter.len();
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
        tracing::debug!(
            before,
            after = self.limiter.len(),
            "Swept idle rate limit buckets"
        );
    }

    pub fn rate(&self) -> NonZeroU32 {
        self.rate
    }

    pub fn burst(&self) -> NonZeroU32 {
        self.burst
    }
}
