use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

/// Peer metadata tracked by PeerStore
#[derive(Clone, Debug)]
pub struct PeerInfo {
    pub peer_id: String,
    pub addr: String,
    pub listed_at: Instant,
}

/// Peers currently known alive, as last announced by the tracker.
#[derive(Clone, Debug, Default)]
pub struct PeerStore {
    inner: Arc<RwLock<HashMap<String, PeerInfo>>>, // peer_id -> PeerInfo
}

impl PeerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_peer(&self, peer_id: String, addr: String) {
        let mut map = self.inner.write().await;
        map.insert(peer_id.clone(), PeerInfo { peer_id, addr, listed_at: Instant::now() });
    }

    /// Swap in a fresh peer list. Peers missing from it are forgotten.
    pub async fn replace_all(&self, peers: impl IntoIterator<Item = (String, String)>) {
        let now = Instant::now();
        let fresh: HashMap<String, PeerInfo> = peers
            .into_iter()
            .map(|(peer_id, addr)| (peer_id.clone(), PeerInfo { peer_id, addr, listed_at: now }))
            .collect();
        *self.inner.write().await = fresh;
    }

    pub async fn list_peers(&self) -> Vec<PeerInfo> {
        let map = self.inner.read().await;
        let mut peers: Vec<PeerInfo> = map.values().cloned().collect();
        peers.sort_by(|a, b| a.peer_id.cmp(&b.peer_id));
        peers
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}
