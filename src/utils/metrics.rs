use std::collections::BTreeMap;
use std::sync::Arc;
use parking_lot::Mutex;
use lazy_static::lazy_static;
use serde::Serialize;

pub const TX_ADMITTED: &str = "tx_admitted";
pub const TX_REJECTED: &str = "tx_rejected";
pub const TX_DUPLICATE_DROPPED: &str = "tx_duplicate_dropped";
pub const BLOCKS_MINED: &str = "blocks_mined";
pub const BLOCKS_APPENDED: &str = "blocks_appended";
pub const BLOCKS_REJECTED: &str = "blocks_rejected";
pub const FORKS_ADOPTED: &str = "forks_adopted";
pub const MINING_CANCELLED: &str = "mining_cancelled";
pub const PEERS_EVICTED: &str = "peers_evicted";
pub const CHAIN_LENGTH: &str = "chain_length";
pub const MEMPOOL_SIZE: &str = "mempool_size";

/// Point-in-time copy of every counter and gauge.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct MetricsSnapshot {
    pub counters: BTreeMap<String, u64>,
    pub gauges: BTreeMap<String, f64>,
}

/// Metrics registry (simple, Prometheus-style)
#[derive(Clone, Default)]
pub struct MetricsRegistry {
    counters: Arc<Mutex<BTreeMap<String, u64>>>,
    gauges: Arc<Mutex<BTreeMap<String, f64>>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_counter(&self, name: &str) {
        self.add_counter(name, 1);
    }

    pub fn add_counter(&self, name: &str, by: u64) {
        let mut counters = self.counters.lock();
        *counters.entry(name.to_string()).or_insert(0) += by;
    }

    pub fn set_gauge(&self, name: &str, val: f64) {
        self.gauges.lock().insert(name.to_string(), val);
    }

    pub fn counter(&self, name: &str) -> u64 {
        self.counters.lock().get(name).copied().unwrap_or(0)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            counters: self.counters.lock().clone(),
            gauges: self.gauges.lock().clone(),
        }
    }
}

lazy_static! {
    pub static ref METRICS: MetricsRegistry = MetricsRegistry::new();
}
