//! Tracker: peer discovery, liveness, stake bookkeeping and the reference chain.
//!
//! The tracker never mines. It registers peers, hands out peer lists, evicts peers that
//! stop sending heartbeats, keeps the stake ledger, and adopts the best chain reported
//! in heartbeats as its reference chain for vote tallies.

pub mod registry;

use std::sync::Arc;
use std::time::Instant;
use anyhow::Context;
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use crate::consensus::{compare_chains, ConsensusEngine, ForkChoice, LinearStakePolicy, StakeEvent, StakeLedger, StakePolicy};
use crate::crypto::Ed25519Signer;
use crate::ledger::{Block, Ledger, VoteTally};
use crate::network::{
    serve, Envelope, HeartbeatPayload, Message, MessageHandler, MinerInfo, PeerEndpoint, PeerListPayload,
    PeerTransport, ServerConfig, TcpTransport,
};
use crate::node::config::TrackerConfig;
use crate::node::service_handle::ServiceHandle;
use crate::utils::metrics::PEERS_EVICTED;
use crate::utils::{Result, VoteChainError, METRICS};

pub use registry::{PeerRecord, PeerRegistry};

/// What a heartbeat did to the reference chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeartbeatOutcome {
    /// liveness refreshed, reference chain unchanged
    Recorded,
    /// the reported chain replaced the reference chain
    Adopted { new_blocks: usize },
    /// the reported chain failed validation at `index`
    Rejected { index: u64, penalised: Option<String> },
}

pub struct TrackerState {
    pub registry: PeerRegistry,
    pub stakes: StakeLedger,
    pub reference: Ledger,
}

#[derive(Clone)]
pub struct Tracker {
    inner: Arc<TrackerInner>,
}

struct TrackerInner {
    id: String,
    cfg: TrackerConfig,
    engine: ConsensusEngine,
    policy: Arc<dyn StakePolicy>,
    state: Mutex<TrackerState>,
    transport: Arc<dyn PeerTransport>,
}

impl Tracker {
    pub fn new(cfg: TrackerConfig) -> Self {
        let policy = LinearStakePolicy { reward: cfg.stake_reward, penalty: cfg.stake_penalty };
        Self::with_policy(cfg, Arc::new(policy))
    }

    pub fn with_policy(cfg: TrackerConfig, policy: Arc<dyn StakePolicy>) -> Self {
        let id = cfg.bind_addr.clone();
        let transport = Arc::new(TcpTransport::new(
            id.clone(),
            cfg.network.connect_timeout(),
            cfg.network.request_timeout(),
            cfg.network.max_frame_bytes,
        ));
        let state = TrackerState {
            registry: PeerRegistry::new(),
            stakes: StakeLedger::new(cfg.initial_stake),
            reference: Ledger::new(cfg.difficulty),
        };
        let inner = TrackerInner {
            engine: ConsensusEngine::new(cfg.difficulty, 1, Arc::new(Ed25519Signer)),
            state: Mutex::new(state),
            id,
            cfg,
            policy,
            transport,
        };
        Self { inner: Arc::new(inner) }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn register(&self, peer_id: &str, endpoint: PeerEndpoint, now: Instant) -> PeerListPayload {
        let mut st = self.inner.state.lock();
        let stake = st.stakes.assign(peer_id);
        if st.registry.register(peer_id, endpoint, stake, now) {
            info!(peer = %peer_id, stake, peers = st.registry.len(), "peer registered");
        } else {
            debug!(peer = %peer_id, "peer re-registered");
        }
        PeerListPayload { peers: st.registry.endpoints(), stake: Some(stake) }
    }

    /// Refresh liveness and consider the reported chain for the reference chain.
    ///
    /// A report whose tip we already hold, or which fork choice would not prefer, is only
    /// recorded. Otherwise the chain is verified with the state lock released; callers on
    /// the runtime run this on a blocking thread.
    pub fn heartbeat(&self, peer_id: &str, report: HeartbeatPayload, now: Instant) -> Result<HeartbeatOutcome> {
        {
            let mut st = self.inner.state.lock();
            st.registry.heartbeat(peer_id, report.chain_length, &report.last_hash, now)?;
            if report.chain.is_empty()
                || report.last_hash == st.reference.tip_hash()
                || compare_chains(st.reference.blocks(), &report.chain) != ForkChoice::AdoptCandidate
            {
                return Ok(HeartbeatOutcome::Recorded);
            }
        }

        let miners: Vec<String> = report.chain.iter().map(|b| b.miner_id.clone()).collect();
        let verified = match self.inner.engine.verify_chain(report.chain) {
            Ok(verified) => verified,
            Err(VoteChainError::ChainValidationFailure { index, reason }) => {
                let culprit = usize::try_from(index).ok().and_then(|i| miners.get(i));
                let penalised = culprit.and_then(|miner| {
                    let mut st = self.inner.state.lock();
                    let stake = st.stakes.apply(miner, StakeEvent::BlockRejected, self.inner.policy.as_ref())?;
                    st.registry.set_stake(miner, stake);
                    Some(miner.clone())
                });
                warn!(peer = %peer_id, index, penalised = penalised.as_deref().unwrap_or("-"), "reported chain invalid: {reason}");
                return Ok(HeartbeatOutcome::Rejected { index, penalised });
            }
            Err(e) => return Err(e),
        };

        let mut guard = self.inner.state.lock();
        let st = &mut *guard;
        let fresh_miners: Vec<String> = verified
            .iter()
            .filter(|(_, hash)| !st.reference.contains_block(hash))
            .map(|(b, _)| b.miner_id.clone())
            .collect();
        if !st.reference.adopt(verified) {
            return Ok(HeartbeatOutcome::Recorded);
        }
        for miner in &fresh_miners {
            if let Some(stake) = st.stakes.apply(miner, StakeEvent::BlockAdopted, self.inner.policy.as_ref()) {
                st.registry.set_stake(miner, stake);
            }
        }
        info!(
            peer = %peer_id,
            length = st.reference.len(),
            new_blocks = fresh_miners.len(),
            "reference chain advanced"
        );
        Ok(HeartbeatOutcome::Adopted { new_blocks: fresh_miners.len() })
    }

    pub fn miner_info(&self, peer_id: &str) -> Result<MinerInfo> {
        let st = self.inner.state.lock();
        let record = st.registry.get(peer_id).ok_or_else(|| VoteChainError::UnknownPeer(peer_id.to_string()))?;
        let stake_value = st.stakes.get(peer_id).unwrap_or(record.stake_value);
        Ok(MinerInfo {
            peer_id: peer_id.to_string(),
            stake_value,
            difficulty: self.inner.engine.difficulty(stake_value),
        })
    }

    pub fn stake_of(&self, peer_id: &str) -> Option<u64> {
        self.inner.state.lock().stakes.get(peer_id)
    }

    pub fn vote_results(&self) -> VoteTally {
        self.inner.state.lock().reference.vote_tally()
    }

    pub fn reference_chain(&self) -> Vec<Block> {
        self.inner.state.lock().reference.blocks().to_vec()
    }

    pub fn peer_list(&self) -> PeerListPayload {
        PeerListPayload { peers: self.inner.state.lock().registry.endpoints(), stake: None }
    }

    pub fn evict_expired(&self, now: Instant) -> Vec<String> {
        let evicted = self.inner.state.lock().registry.evict_expired(now, self.inner.cfg.liveness_timeout());
        if !evicted.is_empty() {
            METRICS.add_counter(PEERS_EVICTED, evicted.len() as u64);
            info!(evicted = ?evicted, "evicted silent peers");
        }
        evicted
    }

    /// Push the current peer list to every registered peer. Fire-and-forget.
    pub fn broadcast_peer_list(&self) -> usize {
        let list = self.peer_list();
        let targets: Vec<String> = list.peers.values().map(PeerEndpoint::address).collect();
        for addr in &targets {
            let transport = self.inner.transport.clone();
            let msg = Message::PeerList(list.clone());
            let addr = addr.clone();
            tokio::spawn(async move {
                if let Err(e) = transport.send(&addr, msg).await {
                    debug!(peer = %addr, "peer list push failed: {e}");
                }
            });
        }
        targets.len()
    }

    /// Bind the listener and spawn the liveness sweep.
    pub async fn start(&self) -> anyhow::Result<ServiceHandle> {
        let (mut svc, shutdown_rx) = ServiceHandle::new();
        let cfg = &self.inner.cfg;

        let listener = TcpListener::bind(&cfg.bind_addr)
            .await
            .with_context(|| format!("binding {}", cfg.bind_addr))?;
        let server_cfg = ServerConfig {
            local_id: self.inner.id.clone(),
            max_connections: cfg.network.max_connections,
            io_timeout: cfg.network.request_timeout(),
            max_frame_len: cfg.network.max_frame_bytes,
        };
        let handler = Arc::new(self.clone());
        let rx = shutdown_rx.clone();
        svc.attach(tokio::spawn(async move {
            serve(listener, handler, server_cfg, rx).await;
            Ok(())
        }));

        let tracker = self.clone();
        let mut rx = shutdown_rx.clone();
        let period = cfg.sweep_interval();
        svc.attach(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if !tracker.evict_expired(Instant::now()).is_empty() {
                            tracker.broadcast_peer_list();
                        }
                    }
                    changed = rx.changed() => {
                        if changed.is_err() || *rx.borrow() {
                            break;
                        }
                    }
                }
            }
            Ok(())
        }));

        info!(id = %self.inner.id, "tracker started");
        Ok(svc)
    }
}

#[async_trait]
impl MessageHandler for Tracker {
    async fn handle(&self, envelope: Envelope) -> Option<Message> {
        let Envelope { sender, message, .. } = envelope;
        match message {
            Message::Register(endpoint) => {
                let list = self.register(&sender, endpoint, Instant::now());
                self.broadcast_peer_list();
                Some(Message::PeerList(list))
            }
            Message::Heartbeat(report) => {
                let tracker = self.clone();
                let peer = sender.clone();
                let result = tokio::task::spawn_blocking(move || tracker.heartbeat(&peer, report, Instant::now()))
                    .await
                    .unwrap_or_else(|e| Err(VoteChainError::Task(e.to_string())));
                match result {
                    Ok(outcome) => debug!(%sender, ?outcome, "heartbeat"),
                    Err(VoteChainError::UnknownPeer(peer)) => warn!(%peer, "heartbeat from unregistered peer ignored"),
                    Err(e) => warn!(%sender, "heartbeat failed: {e}"),
                }
                None
            }
            Message::GetMiner(_) => match self.miner_info(&sender) {
                Ok(info) => Some(Message::GetMiner(Some(info))),
                Err(e) => {
                    warn!(%sender, "stake query refused: {e}");
                    None
                }
            },
            Message::GetVoteResults(_) => Some(Message::GetVoteResults(Some(self.vote_results()))),
            Message::ChainRequest => Some(Message::ChainResponse(self.reference_chain())),
            other => {
                warn!(%sender, kind = ?other.kind(), "message kind not served by the tracker");
                None
            }
        }
    }
}
