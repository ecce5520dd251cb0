//! Relay service
//!
//! Composes the proxy pool, fetcher and DoH resolver into the single service instance
//! that the binary constructs at startup and hands to the API and background tasks.

use std::net::IpAddr;
use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use crate::config::Config;
use crate::dns::DohResolver;
use crate::error::Result;
use crate::models::{PoolHealth, ProxySummary, StatusReport};
use crate::proxy::{create_sources, rank, ProxyFetcher, ProxyPool, ProxySource};

/// How many ranked proxies a status report lists
const TOP_PROXIES: usize = 5;

pub struct RelayService {
    pool: Arc<ProxyPool>,
    fetcher: ProxyFetcher,
    resolver: DohResolver,
}

impl RelayService {
    /// Build the service with the sources named in the configuration
    pub fn new(config: Config) -> Result<Self> {
        let sources = create_sources(&config.pool.enabled_sources, config.pool.source_timeout)?;
        Self::with_sources(config, sources)
    }

    pub fn with_sources(config: Config, sources: Vec<Arc<dyn ProxySource>>) -> Result<Self> {
        info!(
            "Initializing relay service ({} proxy sources, restricted: {})",
            sources.len(),
            config.pool.restricted_providers.join(",")
        );

        let pool = Arc::new(ProxyPool::new(config.pool, sources));
        let fetcher = ProxyFetcher::new(pool.clone(), config.fetch);
        let resolver = DohResolver::new(config.dns)?;

        Ok(Self {
            pool,
            fetcher,
            resolver,
        })
    }

    #[cfg(test)]
    pub(crate) fn with_resolver(mut self, resolver: DohResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn pool(&self) -> &Arc<ProxyPool> {
        &self.pool
    }

    /// First population of the pool; returns the number of working proxies
    pub async fn initialize(&self) -> usize {
        let working = self.pool.refresh().await;
        info!("Relay service initialized with {} proxies", working);
        working
    }

    /// Operator-triggered refresh, independent of the interval timer
    pub async fn refresh(&self) -> usize {
        self.pool.refresh().await
    }

    pub async fn fetch(
        &self,
        url: &str,
        provider: &str,
        params: &[(String, String)],
        max_retries: Option<u32>,
    ) -> Result<Value> {
        self.fetcher.fetch(url, provider, params, max_retries).await
    }

    /// Resolve with the configured provider and cache
    pub async fn resolve(&self, hostname: &str) -> Option<IpAddr> {
        self.resolver.lookup(hostname).await
    }

    pub async fn resolve_with(
        &self,
        hostname: &str,
        provider: Option<&str>,
        use_cache: bool,
    ) -> Option<IpAddr> {
        self.resolver.resolve(hostname, provider, use_cache).await
    }

    pub fn clear_dns_cache(&self) -> usize {
        self.resolver.clear_cache()
    }

    /// Read-only snapshot of pool health and request counters
    pub fn status(&self) -> StatusReport {
        let (records, last_refresh) = self.pool.snapshot_with_refresh_time();
        let mut active: Vec<_> = records.iter().filter(|r| r.is_active).collect();
        active.sort_by(|a, b| rank(a, b));

        let total = records.len();
        let active_count = active.len();

        StatusReport {
            status: if active_count > 0 {
                PoolHealth::Healthy
            } else {
                PoolHealth::Degraded
            },
            total_proxies: total,
            active_proxies: active_count,
            inactive_proxies: total - active_count,
            last_refresh,
            stats: self.fetcher.counters(),
            top_proxies: active
                .into_iter()
                .take(TOP_PROXIES)
                .map(ProxySummary::from)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::config::PoolConfig;
    use crate::models::{ProxyCandidate, ProxyProtocol, ProxyRecord};
    use crate::test_support::{spawn_stub, StaticSource, StubResponse};

    fn config() -> Config {
        Config {
            pool: PoolConfig {
                test_url: "http://probe.invalid/ip".to_string(),
                test_timeout: Duration::from_secs(2),
                ..PoolConfig::default()
            },
            ..Config::default()
        }
    }

    fn record(endpoint: &str, successes: u64, failures: u64) -> ProxyRecord {
        let (ip, port) = endpoint.rsplit_once(':').unwrap();
        let mut r: ProxyRecord =
            ProxyCandidate::new(ip, port.parse().unwrap(), ProxyProtocol::Http)
                .with_country("DE")
                .into();
        r.success_count = successes;
        r.failure_count = failures;
        r.total_response_time = successes as f64 * 0.5;
        r
    }

    #[test]
    fn test_status_degraded_when_empty() {
        let service = RelayService::with_sources(config(), vec![]).unwrap();
        let status = service.status();

        assert_eq!(status.status, PoolHealth::Degraded);
        assert_eq!(status.total_proxies, 0);
        assert_eq!(status.active_proxies, 0);
        assert!(status.last_refresh.is_none());
        assert!(status.top_proxies.is_empty());
    }

    #[test]
    fn test_status_ranks_top_five_active() {
        let service = RelayService::with_sources(config(), vec![]).unwrap();

        let mut inactive = record("10.0.0.99:80", 50, 0);
        inactive.is_active = false;
        let mut records = vec![inactive];
        for i in 1..=7u64 {
            records.push(record(&format!("10.0.0.{}:80", i), i, 10 - i));
        }
        service.pool().install(records);

        let status = service.status();
        assert!(status.is_healthy());
        assert_eq!(status.total_proxies, 8);
        assert_eq!(status.active_proxies, 7);
        assert_eq!(status.inactive_proxies, 1);
        assert!(status.last_refresh.is_some());
        assert_eq!(status.last_refresh, service.pool().last_refreshed_at());

        let endpoints: Vec<_> = status.top_proxies.iter().map(|p| p.endpoint.as_str()).collect();
        assert_eq!(
            endpoints,
            vec!["10.0.0.7:80", "10.0.0.6:80", "10.0.0.5:80", "10.0.0.4:80", "10.0.0.3:80"]
        );
        assert_eq!(status.top_proxies[0].avg_response_time, Some(0.5));
        assert_eq!(status.top_proxies[0].country, "DE");
    }

    #[tokio::test]
    async fn test_initialize_populates_pool() {
        let proxy = spawn_stub(vec![StubResponse::text(200, "ok")]).await;
        let source = StaticSource::new(
            "static",
            vec![ProxyCandidate::new(
                proxy.addr.ip().to_string(),
                proxy.addr.port(),
                ProxyProtocol::Http,
            )],
        );
        let service = RelayService::with_sources(config(), vec![source]).unwrap();

        assert_eq!(service.initialize().await, 1);
        assert_eq!(service.status().active_proxies, 1);
    }

    #[tokio::test]
    async fn test_fetch_counters_reach_status() {
        let target = spawn_stub(vec![StubResponse::json(200, r#"{"ok": true}"#)]).await;
        let service = RelayService::with_sources(config(), vec![]).unwrap();

        let body = service
            .fetch(&target.url("/ping"), "coincap", &[], None)
            .await
            .unwrap();
        assert_eq!(body["ok"], true);

        let stats = service.status().stats;
        assert_eq!(stats.total_requests, 1);
        assert_eq!(stats.successful_requests, 1);
    }

    #[tokio::test]
    async fn test_resolve_uses_injected_resolver() {
        let doh = spawn_stub(vec![StubResponse::json(
            200,
            r#"{"Answer":[{"data":"10.0.0.5"}]}"#,
        )])
        .await;
        let resolver = DohResolver::new(config().dns)
            .unwrap()
            .with_endpoint("cloudflare", doh.url("/dns-query"));
        let service = RelayService::with_sources(config(), vec![])
            .unwrap()
            .with_resolver(resolver);

        assert_eq!(
            service.resolve("api.binance.com").await,
            "10.0.0.5".parse::<IpAddr>().ok()
        );
        assert_eq!(service.clear_dns_cache(), 1);
    }
}
