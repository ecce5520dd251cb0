use std::net::IpAddr;
use std::time::Duration;

use dashmap::DashMap;

use crate::models::DnsCacheEntry;

/// Hostname to address cache owned by the resolver
#[derive(Debug, Default)]
pub struct DnsCache {
    entries: DashMap<String, DnsCacheEntry>,
}

impl DnsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unexpired address for `hostname`
    pub fn get(&self, hostname: &str) -> Option<IpAddr> {
        self.entries
            .get(hostname)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.ip)
    }

    /// Write or overwrite the entry for `hostname`
    pub fn put(&self, hostname: &str, ip: IpAddr, ttl: Duration) {
        self.insert(DnsCacheEntry::new(hostname, ip, ttl));
    }

    pub fn insert(&self, entry: DnsCacheEntry) {
        self.entries.insert(entry.hostname.clone(), entry);
    }

    pub fn entry(&self, hostname: &str) -> Option<DnsCacheEntry> {
        self.entries.get(hostname).map(|e| e.clone())
    }

    /// Drop every entry, returning how many were removed
    pub fn clear(&self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_skips_expired_entries() {
        let cache = DnsCache::new();
        let ip: IpAddr = "10.0.0.1".parse().unwrap();

        cache.put("fresh.example", ip, Duration::from_secs(60));
        let mut stale = DnsCacheEntry::new("stale.example", ip, Duration::from_secs(60));
        stale.cached_at -= chrono::Duration::seconds(120);
        cache.insert(stale);

        assert_eq!(cache.get("fresh.example"), Some(ip));
        assert_eq!(cache.get("stale.example"), None);
        assert_eq!(cache.get("missing.example"), None);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_put_overwrites_and_clear_counts() {
        let cache = DnsCache::new();
        cache.put("a.example", "10.0.0.1".parse().unwrap(), Duration::from_secs(60));
        cache.put("a.example", "10.0.0.2".parse().unwrap(), Duration::from_secs(60));
        cache.put("b.example", "10.0.0.3".parse().unwrap(), Duration::from_secs(60));

        assert_eq!(cache.get("a.example"), "10.0.0.2".parse::<IpAddr>().ok());
        assert_eq!(cache.clear(), 2);
        assert!(cache.is_empty());
    }
}
