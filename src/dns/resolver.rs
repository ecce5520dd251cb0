//! DNS over HTTPS resolver
//!
//! Queries JSON DoH endpoints for A records, caches answers for the configured TTL and
//! falls back once to a fixed secondary provider.

use std::collections::HashMap;
use std::net::IpAddr;

use reqwest::Client;
use serde::Deserialize;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use crate::config::DnsConfig;
use crate::dns::cache::DnsCache;
use crate::error::{RelayError, Result};
use crate::proxy::transport::HttpTransport;

/// Provider used when the requested name is unknown
pub const PRIMARY_PROVIDER: &str = "cloudflare";
/// Provider tried once after the preferred one fails
pub const FALLBACK_PROVIDER: &str = "google";

const DEFAULT_ENDPOINTS: [(&str, &str); 3] = [
    ("cloudflare", "https://cloudflare-dns.com/dns-query"),
    ("google", "https://dns.google/resolve"),
    ("quad9", "https://dns.quad9.net:5053/dns-query"),
];

#[derive(Debug, Deserialize)]
struct DohResponse {
    #[serde(rename = "Answer", default)]
    answer: Vec<DohAnswer>,
}

#[derive(Debug, Deserialize)]
struct DohAnswer {
    data: String,
}

/// Resolver over the JSON DoH API
pub struct DohResolver {
    config: DnsConfig,
    endpoints: HashMap<String, String>,
    cache: DnsCache,
    client: Client,
}

impl DohResolver {
    pub fn new(config: DnsConfig) -> Result<Self> {
        let client = HttpTransport::direct(config.timeout)?;
        let endpoints = DEFAULT_ENDPOINTS
            .iter()
            .map(|(name, url)| (name.to_string(), url.to_string()))
            .collect();

        Ok(Self {
            config,
            endpoints,
            cache: DnsCache::new(),
            client,
        })
    }

    /// Point a provider name at a different DoH URL
    pub fn with_endpoint(mut self, name: &str, url: impl Into<String>) -> Self {
        self.endpoints.insert(name.to_lowercase(), url.into());
        self
    }

    pub fn cache(&self) -> &DnsCache {
        &self.cache
    }

    /// Resolve with the configured preferred provider, using the cache
    pub async fn lookup(&self, hostname: &str) -> Option<IpAddr> {
        self.resolve(hostname, None, true).await
    }

    /// Resolve `hostname` to an address.
    ///
    /// A cache hit within TTL returns without any network call. When the preferred
    /// provider fails and is not already the fallback, the fallback is queried exactly
    /// once. `None` means neither produced an answer.
    #[instrument(skip(self))]
    pub async fn resolve(
        &self,
        hostname: &str,
        provider: Option<&str>,
        use_cache: bool,
    ) -> Option<IpAddr> {
        if use_cache {
            if let Some(ip) = self.cache.get(hostname) {
                debug!("DNS cache hit: {} -> {}", hostname, ip);
                return Some(ip);
            }
        }

        let preferred = provider.unwrap_or(&self.config.preferred_provider);
        let provider = self.provider_name(preferred);

        match self.query_and_cache(hostname, provider).await {
            Ok(ip) => Some(ip),
            Err(e) => {
                warn!("DoH resolution failed for {} via {}: {}", hostname, provider, e);
                if provider == FALLBACK_PROVIDER {
                    return None;
                }

                info!("Trying fallback DNS provider ({})", FALLBACK_PROVIDER);
                match self.query_and_cache(hostname, FALLBACK_PROVIDER).await {
                    Ok(ip) => Some(ip),
                    Err(e) => {
                        warn!(
                            "DoH resolution failed for {} via {}: {}",
                            hostname, FALLBACK_PROVIDER, e
                        );
                        None
                    }
                }
            }
        }
    }

    /// Drop every cached answer
    pub fn clear_cache(&self) -> usize {
        let cleared = self.cache.clear();
        info!("DNS cache cleared ({} entries)", cleared);
        cleared
    }

    /// Canonical provider name; unknown names map to the primary provider
    fn provider_name<'a>(&'a self, requested: &str) -> &'a str {
        let requested = requested.to_lowercase();
        match self.endpoints.get_key_value(&requested) {
            Some((name, _)) => name.as_str(),
            None => {
                debug!("Unknown DNS provider {}, using {}", requested, PRIMARY_PROVIDER);
                PRIMARY_PROVIDER
            }
        }
    }

    async fn query_and_cache(&self, hostname: &str, provider: &str) -> Result<IpAddr> {
        let ip = self.query(hostname, provider).await?;
        self.cache.put(hostname, ip, self.config.cache_ttl);
        info!("DoH resolved: {} -> {} (via {})", hostname, ip, provider);
        Ok(ip)
    }

    async fn query(&self, hostname: &str, provider: &str) -> Result<IpAddr> {
        let url = self.endpoints.get(provider).ok_or_else(|| {
            RelayError::DnsResolutionFailed(format!("no endpoint for provider {}", provider))
        })?;

        let request = async {
            let response = self
                .client
                .get(url)
                .query(&[("name", hostname), ("type", "A")])
                .header(reqwest::header::ACCEPT, "application/dns-json")
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(RelayError::UpstreamStatus(status.as_u16()));
            }

            let bytes = response.bytes().await?;
            serde_json::from_slice::<DohResponse>(&bytes)
                .map_err(|e| RelayError::InvalidBody(e.to_string()))
        };

        let body = match timeout(self.config.timeout, request).await {
            Ok(result) => result?,
            Err(_) => return Err(RelayError::Timeout),
        };

        body.answer
            .iter()
            .find_map(|answer| answer.data.parse::<IpAddr>().ok())
            .ok_or_else(|| RelayError::DnsResolutionFailed(format!("no answer for {}", hostname)))
    }
}
