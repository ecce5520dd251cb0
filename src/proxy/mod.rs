//! Proxy pool and fetch pipeline
//!
//! This module provides:
//! - Proxy sources feeding candidate endpoints
//! - Health probing of candidates
//! - The live pool with ranking and circuit breaking
//! - Fetching through the best proxy with rotation and retry

pub mod fetcher;
pub mod health;
pub mod pool;
pub mod rate_limit;
pub mod sources;
pub mod transport;

pub use fetcher::{ProxyFetcher, RequestCounters};
pub use health::{HealthProber, ProberConfig};
pub use pool::{rank, ProxyPool, SharedRecord};
pub use rate_limit::ProviderRateLimiter;
pub use sources::{create_sources, ProxySource};
pub use transport::HttpTransport;
