//! Fetch orchestrator
//!
//! Issues a request to an upstream API, routing through the best pooled proxy when the
//! logical provider is restricted, and rotating to a freshly selected proxy with linear
//! backoff on each failed attempt.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{json, Value};
use tracing::{debug, error, instrument, warn};

use crate::config::FetchConfig;
use crate::error::{RelayError, Result};
use crate::models::{CounterSnapshot, ProxyRecord};
use crate::proxy::pool::ProxyPool;
use crate::proxy::rate_limit::ProviderRateLimiter;
use crate::proxy::transport::HttpTransport;

/// Process-wide request counters
#[derive(Debug, Default)]
pub struct RequestCounters {
    total_requests: AtomicU64,
    successful_requests: AtomicU64,
    failed_requests: AtomicU64,
    proxy_rotations: AtomicU64,
}

impl RequestCounters {
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            successful_requests: self.successful_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            proxy_rotations: self.proxy_rotations.load(Ordering::Relaxed),
        }
    }
}

/// Runs fetches with proxy rotation and retry
pub struct ProxyFetcher {
    pool: Arc<ProxyPool>,
    config: FetchConfig,
    limiter: ProviderRateLimiter,
    counters: RequestCounters,
}

impl ProxyFetcher {
    pub fn new(pool: Arc<ProxyPool>, config: FetchConfig) -> Self {
        let limiter = ProviderRateLimiter::new(config.rate_limit_per_minute);
        Self {
            pool,
            config,
            limiter,
            counters: RequestCounters::default(),
        }
    }

    pub fn counters(&self) -> CounterSnapshot {
        self.counters.snapshot()
    }

    /// Fetch `url` on behalf of `provider`.
    ///
    /// `max_retries` overrides the configured attempt count; values below one are
    /// treated as one. Returns the parsed JSON body, or `{"text": ...}` for non-JSON
    /// responses.
    #[instrument(skip(self, params), fields(provider = %provider))]
    pub async fn fetch(
        &self,
        url: &str,
        provider: &str,
        params: &[(String, String)],
        max_retries: Option<u32>,
    ) -> Result<Value> {
        self.counters.total_requests.fetch_add(1, Ordering::Relaxed);

        if let Err(e) = self.limiter.check(provider) {
            self.counters.failed_requests.fetch_add(1, Ordering::Relaxed);
            return Err(e);
        }

        let attempts = max_retries.unwrap_or(self.config.max_retries).max(1);

        for attempt in 0..attempts {
            let proxy = self.pool.select_best(provider).await;

            let started = Instant::now();
            let outcome = self.attempt(url, params, proxy.as_ref()).await;
            let elapsed = started.elapsed();

            match outcome {
                Ok(body) => {
                    if let Some(proxy) = &proxy {
                        self.pool.record_outcome(&proxy.endpoint, true, elapsed);
                    }
                    self.counters
                        .successful_requests
                        .fetch_add(1, Ordering::Relaxed);
                    debug!(
                        "Fetched {} in {:.2}s (attempt {}/{})",
                        url,
                        elapsed.as_secs_f64(),
                        attempt + 1,
                        attempts
                    );
                    return Ok(body);
                }
                Err(e) => {
                    warn!(
                        "Request failed (attempt {}/{}): {}",
                        attempt + 1,
                        attempts,
                        e
                    );

                    if let Some(proxy) = &proxy {
                        self.pool.record_outcome(&proxy.endpoint, false, elapsed);
                        self.counters.proxy_rotations.fetch_add(1, Ordering::Relaxed);
                    }

                    if attempt + 1 < attempts {
                        tokio::time::sleep(self.backoff(attempt)).await;
                    }
                }
            }
        }

        self.counters.failed_requests.fetch_add(1, Ordering::Relaxed);
        error!("All {} attempts failed for {}", attempts, url);
        Err(RelayError::FetchFailed {
            url: url.to_string(),
            attempts,
        })
    }

    /// Linear backoff before the attempt following `attempt`
    fn backoff(&self, attempt: u32) -> Duration {
        self.config.backoff_base * (attempt + 1)
    }

    async fn attempt(
        &self,
        url: &str,
        params: &[(String, String)],
        proxy: Option<&ProxyRecord>,
    ) -> Result<Value> {
        let client = HttpTransport::client_for(proxy, self.config.request_timeout)?;

        let response = client.get(url).query(params).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::UpstreamStatus(status.as_u16()));
        }

        let is_json = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("application/json"));

        let body = response.text().await?;
        if is_json {
            serde_json::from_str(&body).map_err(|e| RelayError::InvalidBody(e.to_string()))
        } else {
            Ok(json!({ "text": body }))
        }
    }
}
