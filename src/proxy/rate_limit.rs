//! Per-provider rate limiting for outbound fetches
//!
//! Uses the governor crate; each provider gets its own lock-free limiter.

use std::num::NonZeroU32;
use std::sync::Arc;

use dashmap::DashMap;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as GovRateLimiter};
use tracing::{debug, warn};

use crate::error::{RelayError, Result};

type DirectLimiter = GovRateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Rate limiter keyed by logical provider name
pub struct ProviderRateLimiter {
    /// `None` when limiting is disabled
    per_minute: Option<NonZeroU32>,
    limiters: DashMap<String, Arc<DirectLimiter>>,
}

impl ProviderRateLimiter {
    /// A quota of zero disables limiting
    pub fn new(requests_per_minute: u32) -> Self {
        Self {
            per_minute: NonZeroU32::new(requests_per_minute),
            limiters: DashMap::new(),
        }
    }

    pub fn disabled() -> Self {
        Self::new(0)
    }

    pub fn is_enabled(&self) -> bool {
        self.per_minute.is_some()
    }

    /// Check whether another request to `provider` is allowed right now
    pub fn check(&self, provider: &str) -> Result<()> {
        let Some(per_minute) = self.per_minute else {
            return Ok(());
        };

        let key = provider.to_lowercase();
        let limiter = self
            .limiters
            .entry(key.clone())
            .or_insert_with(|| Arc::new(GovRateLimiter::direct(Quota::per_minute(per_minute))))
            .clone();

        match limiter.check() {
            Ok(_) => {
                debug!("Rate limit check passed for {}", key);
                Ok(())
            }
            Err(_) => {
                warn!("Rate limit exceeded for {}", key);
                Err(RelayError::RateLimitExceeded { provider: key })
            }
        }
    }

    /// Number of providers seen so far
    pub fn provider_count(&self) -> usize {
        self.limiters.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_always_allows() {
        let limiter = ProviderRateLimiter::disabled();
        assert!(!limiter.is_enabled());
        for _ in 0..500 {
            assert!(limiter.check("binance").is_ok());
        }
        assert_eq!(limiter.provider_count(), 0);
    }

    #[test]
    fn test_blocks_over_quota() {
        let limiter = ProviderRateLimiter::new(2);

        assert!(limiter.check("binance").is_ok());
        assert!(limiter.check("Binance").is_ok());
        assert!(matches!(
            limiter.check("binance"),
            Err(RelayError::RateLimitExceeded { provider }) if provider == "binance"
        ));
    }

    #[test]
    fn test_providers_are_independent() {
        let limiter = ProviderRateLimiter::new(1);

        assert!(limiter.check("binance").is_ok());
        assert!(limiter.check("coingecko").is_ok());
        assert!(limiter.check("binance").is_err());
        assert_eq!(limiter.provider_count(), 2);
    }
}
