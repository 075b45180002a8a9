use std::collections::BTreeSet;
use std::num::NonZeroUsize;
use std::sync::Arc;
use lru::LruCache;
use parking_lot::Mutex;
use tracing::debug;
use crate::network::message::Message;
use crate::network::peerstore::{PeerInfo, PeerStore};
use crate::network::topology::Topology;
use crate::network::transport::PeerTransport;

/// Gossiper: relays blocks and votes to topology neighbours with dedup.
/// - the seen cache stops a message from being relayed twice
/// - delivery is fire-and-forget; an unreachable neighbour is logged and skipped
pub struct Gossiper {
    local_id: String,
    neighbours: Option<BTreeSet<String>>,
    peerstore: PeerStore,
    transport: Arc<dyn PeerTransport>,
    seen: Mutex<LruCache<String, ()>>,
}

impl Gossiper {
    pub fn new(
        local_id: impl Into<String>,
        topology: &Topology,
        peerstore: PeerStore,
        transport: Arc<dyn PeerTransport>,
        seen_capacity: usize,
    ) -> Self {
        let local_id = local_id.into();
        let cap = NonZeroUsize::new(seen_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            neighbours: topology.neighbours(&local_id),
            local_id,
            peerstore,
            transport,
            seen: Mutex::new(LruCache::new(cap)),
        }
    }

    /// Record `key`; true the first time it is seen.
    pub fn mark_seen(&self, key: &str) -> bool {
        self.seen.lock().put(key.to_string(), ()).is_none()
    }

    pub fn is_seen(&self, key: &str) -> bool {
        self.seen.lock().contains(key)
    }

    /// Live neighbours, minus `exclude`. Without a topology every known peer counts.
    pub async fn targets(&self, exclude: Option<&str>) -> Vec<PeerInfo> {
        self.peerstore
            .list_peers()
            .await
            .into_iter()
            .filter(|p| p.peer_id != self.local_id)
            .filter(|p| Some(p.peer_id.as_str()) != exclude)
            .filter(|p| self.neighbours.as_ref().map_or(true, |n| n.contains(&p.peer_id)))
            .collect()
    }

    /// Send `message` to every target without waiting. Returns how many sends were started.
    pub async fn broadcast(&self, message: Message, exclude: Option<&str>) -> usize {
        let targets = self.targets(exclude).await;
        let kind = message.kind();
        for peer in &targets {
            let transport = self.transport.clone();
            let addr = peer.addr.clone();
            let msg = message.clone();
            tokio::spawn(async move {
                if let Err(e) = transport.send(&addr, msg).await {
                    debug!(peer = %addr, ?kind, "gossip send failed: {e}");
                }
            });
        }
        targets.len()
    }
}

pub fn block_key(hash: &str) -> String {
    format!("block:{hash}")
}

pub fn tx_key(tx_id: &str) -> String {
    format!("tx:{tx_id}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::network::message::Envelope;
    use crate::utils::{Result, VoteChainError};

    struct Unreachable;

    #[async_trait]
    impl PeerTransport for Unreachable {
        async fn send(&self, peer: &str, _message: Message) -> Result<()> {
            Err(VoteChainError::PeerUnreachable { peer: peer.into(), reason: "down".into() })
        }
        async fn request(&self, peer: &str, _message: Message) -> Result<Envelope> {
            Err(VoteChainError::SyncTimeout { peer: peer.into() })
        }
    }

    async fn store() -> PeerStore {
        let store = PeerStore::new();
        for id in ["a:1", "b:1", "c:1", "me:1"] {
            store.add_peer(id.into(), id.into()).await;
        }
        store
    }

    #[tokio::test]
    async fn targets_follow_topology_and_skip_origin() {
        let topo = Topology::parse("me:1 -> a:1, b:1").unwrap();
        let g = Gossiper::new("me:1", &topo, store().await, Arc::new(Unreachable), 8);
        let ids: Vec<_> = g.targets(Some("a:1")).await.into_iter().map(|p| p.peer_id).collect();
        assert_eq!(ids, vec!["b:1"]);
    }

    #[tokio::test]
    async fn no_topology_means_everyone_but_self() {
        let g = Gossiper::new("me:1", &Topology::default(), store().await, Arc::new(Unreachable), 8);
        assert_eq!(g.targets(None).await.len(), 3);
        // failures are swallowed
        assert_eq!(g.broadcast(Message::ChainRequest, None).await, 3);
    }

    #[test]
    fn seen_cache_dedups() {
        let g = Gossiper::new("me:1", &Topology::default(), PeerStore::new(), Arc::new(Unreachable), 2);
        assert!(!g.is_seen(&block_key("x")));
        assert!(g.mark_seen(&block_key("x")));
        assert!(g.is_seen(&block_key("x")));
        assert!(!g.mark_seen(&block_key("x")));
        assert!(g.mark_seen(&tx_key("x")));
    }
}
