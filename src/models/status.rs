use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ProxyRecord;

/// Overall pool health
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolHealth {
    Healthy,
    Degraded,
}

/// Global request counters at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CounterSnapshot {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub proxy_rotations: u64,
}

/// Ranked proxy summary shown in status reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxySummary {
    pub endpoint: String,
    pub success_rate: f64,
    /// Seconds; `None` until the proxy has a successful request
    pub avg_response_time: Option<f64>,
    pub country: String,
}

impl From<&ProxyRecord> for ProxySummary {
    fn from(record: &ProxyRecord) -> Self {
        let avg = record.avg_response_time();
        ProxySummary {
            endpoint: record.endpoint.clone(),
            success_rate: record.success_rate(),
            avg_response_time: avg.is_finite().then_some(avg),
            country: record.country.clone(),
        }
    }
}

/// Read-only snapshot of the pool and request counters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    pub status: PoolHealth,
    pub total_proxies: usize,
    pub active_proxies: usize,
    pub inactive_proxies: usize,
    pub last_refresh: Option<DateTime<Utc>>,
    pub stats: CounterSnapshot,
    pub top_proxies: Vec<ProxySummary>,
}

impl StatusReport {
    pub fn is_healthy(&self) -> bool {
        self.status == PoolHealth::Healthy
    }
}
