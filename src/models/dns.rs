use std::net::IpAddr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Cached DoH answer for one hostname
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DnsCacheEntry {
    pub hostname: String,
    pub ip: IpAddr,
    pub cached_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl DnsCacheEntry {
    pub fn new(hostname: impl Into<String>, ip: IpAddr, ttl: Duration) -> Self {
        Self {
            hostname: hostname.into(),
            ip,
            cached_at: Utc::now(),
            ttl,
        }
    }

    /// An entry expires once its age strictly exceeds the TTL
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match (now - self.cached_at).to_std() {
            Ok(age) => age > self.ttl,
            // Clock went backwards; keep the entry
            Err(_) => false,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}
