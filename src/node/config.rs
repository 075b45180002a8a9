use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use crate::consensus::DifficultyCurve;

/// Socket-level knobs shared by peers and the tracker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NetworkConfig {
    pub connect_timeout_ms: u64,
    /// bounds every read/write, including the wait for a reply
    pub request_timeout_ms: u64,
    pub max_connections: usize,
    pub max_frame_bytes: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 2_000,
            request_timeout_ms: 5_000,
            max_connections: 64,
            max_frame_bytes: 16 * 1024 * 1024,
        }
    }
}

impl NetworkConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Configuration for one peer node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NodeConfig {
    /// listen address; doubles as the peer id unless `advertise_addr` is set
    pub bind_addr: String,
    pub advertise_addr: Option<String>,
    pub tracker_addr: Option<String>,
    pub topology_path: Option<PathBuf>,
    /// hex Ed25519 secret; a fresh key is generated when absent
    pub secret_key: Option<String>,
    pub rpc_addr: Option<String>,
    pub auto_mine: bool,
    pub max_block_transactions: usize,
    pub mempool_capacity: usize,
    pub heartbeat_interval_ms: u64,
    pub register_retry_base_ms: u64,
    pub register_retry_max_ms: u64,
    pub seen_cache_capacity: usize,
    pub mining_check_interval: u64,
    pub difficulty: DifficultyCurve,
    pub network: NetworkConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:5001".into(),
            advertise_addr: None,
            tracker_addr: Some("127.0.0.1:5000".into()),
            topology_path: None,
            secret_key: None,
            rpc_addr: None,
            auto_mine: false,
            max_block_transactions: 100,
            mempool_capacity: 10_000,
            heartbeat_interval_ms: 10_000,
            register_retry_base_ms: 500,
            register_retry_max_ms: 30_000,
            seen_cache_capacity: 4_096,
            mining_check_interval: 1_024,
            difficulty: DifficultyCurve::default(),
            network: NetworkConfig::default(),
        }
    }
}

impl NodeConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        load_toml(path.as_ref())
    }

    pub fn node_id(&self) -> String {
        self.advertise_addr.clone().unwrap_or_else(|| self.bind_addr.clone())
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }
}

/// Configuration for the tracker process.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TrackerConfig {
    pub bind_addr: String,
    pub initial_stake: u64,
    pub liveness_timeout_ms: u64,
    pub sweep_interval_ms: u64,
    pub stake_reward: u64,
    pub stake_penalty: u64,
    pub difficulty: DifficultyCurve,
    pub network: NetworkConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:5000".into(),
            initial_stake: 0,
            liveness_timeout_ms: 30_000,
            sweep_interval_ms: 10_000,
            stake_reward: 1,
            stake_penalty: 1,
            difficulty: DifficultyCurve::default(),
            network: NetworkConfig::default(),
        }
    }
}

impl TrackerConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        load_toml(path.as_ref())
    }

    pub fn liveness_timeout(&self) -> Duration {
        Duration::from_millis(self.liveness_timeout_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}

fn load_toml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let data = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let cfg = toml::from_str(&data).with_context(|| format!("parsing {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "bind_addr = \"127.0.0.1:6001\"\nauto_mine = true\n[difficulty]\nbase = 2\n[network]\nrequest_timeout_ms = 900"
        )
        .unwrap();
        let cfg = NodeConfig::load(file.path()).unwrap();
        assert_eq!(cfg.node_id(), "127.0.0.1:6001");
        assert!(cfg.auto_mine);
        assert_eq!(cfg.difficulty.base, 2);
        assert_eq!(cfg.difficulty.max, 8);
        assert_eq!(cfg.network.request_timeout(), Duration::from_millis(900));
        assert_eq!(cfg.max_block_transactions, 100);
    }

    #[test]
    fn tracker_defaults_match_liveness_rules() {
        let cfg = TrackerConfig::default();
        assert_eq!(cfg.liveness_timeout(), Duration::from_secs(30));
        assert_eq!(cfg.sweep_interval(), Duration::from_secs(10));
    }

    #[test]
    fn bad_toml_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bind_addr = [").unwrap();
        assert!(TrackerConfig::load(file.path()).is_err());
    }
}
