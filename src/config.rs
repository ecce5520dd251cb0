use crate::error::{RelayError, Result};
use std::env;
use std::time::Duration;
use url::Url;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Proxy pool configuration
    pub pool: PoolConfig,
    /// Outbound fetch configuration
    pub fetch: FetchConfig,
    /// DNS-over-HTTPS configuration
    pub dns: DnsConfig,
    /// API server configuration
    pub api: ApiServerConfig,
    /// Logging configuration
    pub log: LogConfig,
}

#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// How long a refreshed live set stays fresh (default: 300s)
    pub refresh_interval: Duration,
    /// Timeout for a single proxy probe (default: 5s)
    pub test_timeout: Duration,
    /// Failures before a proxy is deactivated (default: 3)
    pub max_failures: u32,
    /// Endpoint every candidate is probed against
    pub test_url: String,
    /// Upper bound on candidates validated per refresh (default: 50)
    pub sample_size: usize,
    /// Timeout for a single proxy source download (default: 10s)
    pub source_timeout: Duration,
    /// Proxy sources to pull candidates from
    pub enabled_sources: Vec<String>,
    /// Logical provider names whose traffic must go through a proxy (lowercased)
    pub restricted_providers: Vec<String>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(300),
            test_timeout: Duration::from_secs(5),
            max_failures: 3,
            test_url: "https://httpbin.org/ip".to_string(),
            sample_size: 50,
            source_timeout: Duration::from_secs(10),
            enabled_sources: split_list("proxyscrape,proxylist,geonode"),
            restricted_providers: split_list("binance,coingecko,coinmarketcap"),
        }
    }
}

impl PoolConfig {
    /// Check whether a logical provider requires a proxy
    pub fn is_restricted(&self, provider_name: &str) -> bool {
        let name = provider_name.trim().to_lowercase();
        self.restricted_providers.iter().any(|p| *p == name)
    }
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Timeout for a single attempt (default: 15s)
    pub request_timeout: Duration,
    /// Attempts per fetch when the caller does not specify (default: 3)
    pub max_retries: u32,
    /// Linear backoff base; attempt N sleeps base * (N + 1)
    pub backoff_base: Duration,
    /// Requests per minute allowed per logical provider (0 = unlimited)
    pub rate_limit_per_minute: u32,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(15),
            max_retries: 3,
            backoff_base: Duration::from_millis(1000),
            rate_limit_per_minute: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DnsConfig {
    /// How long a resolved address stays cached (default: 300s)
    pub cache_ttl: Duration,
    /// Timeout for a single DoH query (default: 5s)
    pub timeout: Duration,
    /// Provider queried first when the caller has no preference
    pub preferred_provider: String,
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(300),
            timeout: Duration::from_secs(5),
            preferred_provider: "cloudflare".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Port for the API server (default: 8001)
    pub port: u16,
    /// Host to bind to (default: 0.0.0.0)
    pub host: String,
    /// Allowed CORS origins (comma-separated, empty = localhost only)
    pub cors_origins: Vec<String>,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            port: 8001,
            host: "0.0.0.0".to_string(),
            cors_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level (debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty)
    pub format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let test_url = get_env_or("PROXY_TEST_URL", "https://httpbin.org/ip");
        Url::parse(&test_url).map_err(|e| {
            RelayError::InvalidConfig(format!("PROXY_TEST_URL must be a valid URL: {}", e))
        })?;

        Ok(Config {
            pool: PoolConfig {
                refresh_interval: secs_env("PROXY_REFRESH_INTERVAL", 300),
                test_timeout: secs_env("PROXY_TEST_TIMEOUT", 5),
                max_failures: get_env_or("PROXY_MAX_FAILURES", "3")
                    .parse::<u32>()
                    .unwrap_or(3)
                    .max(1),
                test_url,
                sample_size: get_env_or("PROXY_SAMPLE_SIZE", "50").parse().unwrap_or(50),
                source_timeout: secs_env("PROXY_SOURCE_TIMEOUT", 10),
                enabled_sources: split_list(&get_env_or(
                    "ENABLED_PROXY_PROVIDERS",
                    "proxyscrape,proxylist,geonode",
                )),
                restricted_providers: split_list(&get_env_or(
                    "RESTRICTED_PROVIDERS",
                    "binance,coingecko,coinmarketcap",
                )),
            },
            fetch: FetchConfig {
                request_timeout: secs_env("FETCH_TIMEOUT", 15),
                max_retries: get_env_or("FETCH_MAX_RETRIES", "3")
                    .parse::<u32>()
                    .unwrap_or(3)
                    .max(1),
                backoff_base: Duration::from_millis(
                    get_env_or("FETCH_BACKOFF_BASE_MS", "1000")
                        .parse()
                        .unwrap_or(1000),
                ),
                rate_limit_per_minute: get_env_or("FETCH_RATE_LIMIT_PER_MINUTE", "0")
                    .parse()
                    .unwrap_or(0),
            },
            dns: DnsConfig {
                cache_ttl: secs_env("DNS_CACHE_TTL", 300),
                timeout: secs_env("DNS_TIMEOUT", 5),
                preferred_provider: get_env_or("DNS_PREFERRED_PROVIDER", "cloudflare")
                    .trim()
                    .to_lowercase(),
            },
            api: ApiServerConfig {
                port: get_env_or("API_PORT", "8001").parse().map_err(|_| {
                    RelayError::InvalidConfig("API_PORT must be a valid port number".into())
                })?,
                host: get_env_or("API_HOST", "0.0.0.0"),
                cors_origins: get_env_or("CORS_ORIGINS", "")
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
            log: LogConfig {
                level: get_env_or("LOG_LEVEL", "info"),
                format: get_env_or("LOG_FORMAT", "json"),
            },
        })
    }

    /// Get the API server address
    pub fn api_addr(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

/// Split a comma-separated list into trimmed, lowercased, non-empty names
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn secs_env(key: &str, default: u64) -> Duration {
    Duration::from_secs(
        get_env_or(key, &default.to_string())
            .parse()
            .unwrap_or(default),
    )
}

/// Get environment variable with a default value
fn get_env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
