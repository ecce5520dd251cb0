//! Proxy relay
//!
//! Routes outbound API requests for geo-restricted providers through a rotating pool of
//! validated public proxies.
//!
//! ## Features
//!
//! - Proxy candidates pulled from several public feeds, sampled and health probed
//! - Best-first selection by success rate and latency, with a per-proxy circuit breaker
//! - Fetch with proxy rotation, linear backoff and optional per-provider rate limits
//! - DNS over HTTPS with a TTL cache and a single fallback provider
//! - Status reporting and an HTTP API

pub mod api;
pub mod config;
pub mod dns;
pub mod error;
pub mod manager;
pub mod models;
pub mod proxy;
pub mod services;

#[cfg(test)]
mod test_support;

pub use config::Config;
pub use error::{RelayError, Result};
pub use manager::RelayService;
