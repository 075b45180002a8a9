use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use crate::network::PeerEndpoint;
use crate::utils::{Result, VoteChainError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerRecord {
    pub peer_id: String,
    pub endpoint: PeerEndpoint,
    pub last_heartbeat: Instant,
    pub stake_value: u64,
    pub chain_length: u64,
    pub last_known_hash: String,
}

/// Peers the tracker currently considers alive, keyed by peer id.
#[derive(Debug, Clone, Default)]
pub struct PeerRegistry {
    records: BTreeMap<String, PeerRecord>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or refresh a registration. Returns true for a first-time registration.
    pub fn register(&mut self, peer_id: &str, endpoint: PeerEndpoint, stake: u64, now: Instant) -> bool {
        match self.records.get_mut(peer_id) {
            Some(record) => {
                record.endpoint = endpoint;
                record.last_heartbeat = now;
                record.stake_value = stake;
                false
            }
            None => {
                self.records.insert(
                    peer_id.to_string(),
                    PeerRecord {
                        peer_id: peer_id.to_string(),
                        endpoint,
                        last_heartbeat: now,
                        stake_value: stake,
                        chain_length: 0,
                        last_known_hash: String::new(),
                    },
                );
                true
            }
        }
    }

    pub fn heartbeat(&mut self, peer_id: &str, chain_length: u64, last_hash: &str, now: Instant) -> Result<()> {
        let record = self
            .records
            .get_mut(peer_id)
            .ok_or_else(|| VoteChainError::UnknownPeer(peer_id.to_string()))?;
        record.last_heartbeat = now;
        record.chain_length = chain_length;
        record.last_known_hash = last_hash.to_string();
        Ok(())
    }

    pub fn set_stake(&mut self, peer_id: &str, stake: u64) {
        if let Some(record) = self.records.get_mut(peer_id) {
            record.stake_value = stake;
        }
    }

    /// Drop every peer whose last heartbeat is older than `timeout`. Returns the evicted ids.
    pub fn evict_expired(&mut self, now: Instant, timeout: Duration) -> Vec<String> {
        let expired: Vec<String> = self
            .records
            .values()
            .filter(|r| now.saturating_duration_since(r.last_heartbeat) > timeout)
            .map(|r| r.peer_id.clone())
            .collect();
        for id in &expired {
            self.records.remove(id);
        }
        expired
    }

    pub fn get(&self, peer_id: &str) -> Option<&PeerRecord> {
        self.records.get(peer_id)
    }

    pub fn endpoints(&self) -> BTreeMap<String, PeerEndpoint> {
        self.records
            .iter()
            .map(|(id, r)| (id.clone(), r.endpoint.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
