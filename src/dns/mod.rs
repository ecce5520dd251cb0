//! DNS over HTTPS resolution with a TTL cache

pub mod cache;
pub mod resolver;

pub use cache::DnsCache;
pub use resolver::{DohResolver, FALLBACK_PROVIDER, PRIMARY_PROVIDER};
