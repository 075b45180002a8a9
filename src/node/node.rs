//! Node orchestration: one context object per peer wiring ledger, mempool, consensus,
//! gossip and the tracker session.
//!
//! Ledger and mempool share one lock (`ChainState`) so admission, append and
//! reconciliation never observe each other half-done. The lock is never held across an
//! await or during the nonce search.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use anyhow::Context;
use async_trait::async_trait;
use futures::future::join_all;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::time::{sleep, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};
use crate::consensus::{compare_chains, BlockDisposition, ConsensusEngine, ForkChoice, MiningJob};
use crate::crypto::{Ed25519Signer, Keypair, SigningService};
use crate::ledger::{Block, BlockDetail, ChainInfo, Ledger, Transaction, VerifiedChain, VoteTally};
use crate::network::gossip::{block_key, tx_key};
use crate::network::{
    serve, Envelope, Gossiper, HeartbeatPayload, Message, MessageHandler, PeerEndpoint, PeerListPayload,
    PeerStore, PeerTransport, ServerConfig, TcpTransport, Topology,
};
use crate::node::config::NodeConfig;
use crate::node::service_handle::{wait_for_shutdown, ServiceHandle};
use crate::txpool::{Mempool, VoteValidator};
use crate::utils::metrics::{
    BLOCKS_APPENDED, BLOCKS_MINED, BLOCKS_REJECTED, CHAIN_LENGTH, FORKS_ADOPTED, MEMPOOL_SIZE, MINING_CANCELLED,
    TX_ADMITTED, TX_DUPLICATE_DROPPED, TX_REJECTED,
};
use crate::utils::{Result, VoteChainError, METRICS};

/// Ledger + mempool, mutated together.
pub struct ChainState {
    pub ledger: Ledger,
    pub mempool: Mempool,
}

impl ChainState {
    fn new(cfg: &NodeConfig) -> Self {
        Self { ledger: Ledger::new(cfg.difficulty), mempool: Mempool::new(cfg.mempool_capacity) }
    }

    fn accept_foreign(&mut self, engine: &ConsensusEngine, block: Block) -> Result<String> {
        let hash = engine.accept_block(&mut self.ledger, block)?;
        self.mempool.reconcile(&self.ledger);
        Ok(hash)
    }

    fn append_local(&mut self, block: Block) -> Result<String> {
        let hash = self.ledger.append(block)?;
        self.mempool.reconcile(&self.ledger);
        Ok(hash)
    }

    fn adopt_verified(&mut self, chain: VerifiedChain) -> bool {
        let replaced = self.ledger.adopt(chain);
        if replaced {
            self.mempool.reconcile(&self.ledger);
        }
        replaced
    }

    fn publish_gauges(&self) {
        METRICS.set_gauge(CHAIN_LENGTH, self.ledger.len() as f64);
        METRICS.set_gauge(MEMPOOL_SIZE, self.mempool.len() as f64);
    }
}

/// What happened to a block received from a peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockOutcome {
    Duplicate,
    Appended,
    /// the sender's chain replaced ours
    Adopted,
    /// fork resolution kept our chain
    Kept,
}

/// Main Node object. Cheap to clone; every clone shares the same state.
#[derive(Clone)]
pub struct Node {
    inner: Arc<NodeInner>,
}

struct NodeInner {
    id: String,
    cfg: NodeConfig,
    keypair: Keypair,
    engine: ConsensusEngine,
    validator: VoteValidator,
    state: Mutex<ChainState>,
    mining: Mutex<Option<MiningJob>>,
    stake: AtomicU64,
    peers: PeerStore,
    gossip: Gossiper,
    transport: Arc<dyn PeerTransport>,
}

impl Node {
    pub fn new(cfg: NodeConfig) -> Result<Self> {
        let topology = match &cfg.topology_path {
            Some(path) => Topology::load(path)?,
            None => Topology::default(),
        };
        Self::with_topology(cfg, topology)
    }

    pub fn with_topology(cfg: NodeConfig, topology: Topology) -> Result<Self> {
        let keypair = match &cfg.secret_key {
            Some(secret) => Keypair::from_secret_hex(secret)?,
            None => Keypair::generate(),
        };
        let id = cfg.node_id();
        let signer: Arc<dyn SigningService> = Arc::new(Ed25519Signer);
        let transport: Arc<dyn PeerTransport> = Arc::new(TcpTransport::new(
            id.clone(),
            cfg.network.connect_timeout(),
            cfg.network.request_timeout(),
            cfg.network.max_frame_bytes,
        ));
        let peers = PeerStore::new();
        let gossip = Gossiper::new(id.clone(), &topology, peers.clone(), transport.clone(), cfg.seen_cache_capacity);

        let inner = NodeInner {
            engine: ConsensusEngine::new(cfg.difficulty, cfg.mining_check_interval, signer.clone()),
            validator: VoteValidator::new(signer),
            state: Mutex::new(ChainState::new(&cfg)),
            mining: Mutex::new(None),
            stake: AtomicU64::new(0),
            id,
            cfg,
            keypair,
            peers,
            gossip,
            transport,
        };
        Ok(Self { inner: Arc::new(inner) })
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Voter id used by `cast_vote`.
    pub fn public_key(&self) -> String {
        self.inner.keypair.public_hex()
    }

    pub fn stake(&self) -> u64 {
        self.inner.stake.load(Ordering::Relaxed)
    }

    pub fn set_stake(&self, stake: u64) {
        self.inner.stake.store(stake, Ordering::Relaxed);
    }

    pub fn peers(&self) -> &PeerStore {
        &self.inner.peers
    }

    pub fn chain(&self) -> Vec<Block> {
        self.inner.state.lock().ledger.blocks().to_vec()
    }

    pub fn chain_len(&self) -> usize {
        self.inner.state.lock().ledger.len()
    }

    pub fn tip_hash(&self) -> String {
        self.inner.state.lock().ledger.tip_hash().to_string()
    }

    pub fn pending_count(&self) -> usize {
        self.inner.state.lock().mempool.len()
    }

    pub fn has_pending(&self, tx_id: &str) -> bool {
        self.inner.state.lock().mempool.contains(tx_id)
    }

    pub fn is_mining(&self) -> bool {
        self.inner.mining.lock().as_ref().is_some_and(|job| !job.is_cancelled())
    }

    // ---------------------------------------------------------------------
    // Local actions
    // ---------------------------------------------------------------------

    /// Admit a transaction from a local client, then gossip it.
    pub async fn submit_transaction(&self, tx: Transaction) -> Result<Transaction> {
        self.admit(tx.clone())?;
        self.inner.gossip.mark_seen(&tx_key(&tx.id));
        info!(tx = %tx.id, vote = %tx.vote_data, "transaction admitted");
        self.inner.gossip.broadcast(Message::NewTransaction(tx.clone()), None).await;
        if self.inner.cfg.auto_mine {
            self.request_mine();
        }
        Ok(tx)
    }

    /// Build, sign and submit a vote with this node's own key pair.
    pub async fn cast_vote(&self, vote_data: &str) -> Result<Transaction> {
        let tx = Transaction::signed(vote_data, &self.inner.keypair, self.inner.engine.signer())?;
        self.submit_transaction(tx).await
    }

    /// Start mining in the background. False when there is nothing to mine or a job is
    /// already running.
    pub fn request_mine(&self) -> bool {
        if self.is_mining() || self.pending_count() == 0 {
            return false;
        }
        let node = self.clone();
        tokio::spawn(async move {
            match node.mine_pending().await {
                Ok(_) => {}
                Err(VoteChainError::StaleMiningWork) => debug!("mining attempt superseded"),
                Err(e) => warn!("mining failed: {e}"),
            }
        });
        true
    }

    /// Mine the oldest pending transactions on top of the current tip, append the result
    /// and broadcast it. `Ok(None)` when the pool is empty or another job is running.
    pub async fn mine_pending(&self) -> Result<Option<Block>> {
        let (previous, pending) = {
            let st = self.inner.state.lock();
            if st.mempool.is_empty() {
                return Ok(None);
            }
            (st.ledger.tip().clone(), st.mempool.take(self.inner.cfg.max_block_transactions))
        };
        let height = previous.index + 1;
        let job = {
            let mut slot = self.inner.mining.lock();
            if slot.as_ref().is_some_and(|j| !j.is_cancelled()) {
                debug!(height, "mining already in progress");
                return Ok(None);
            }
            let job = MiningJob::new(height);
            *slot = Some(job.clone());
            job
        };

        let stake = self.stake();
        let engine = self.inner.engine.clone();
        let miner = self.inner.id.clone();
        let token = job.token();
        info!(height, txs = pending.len(), stake, difficulty = engine.difficulty(stake), "mining");
        let mined = tokio::task::spawn_blocking(move || engine.mine(&previous, pending, &miner, stake, &token)).await;
        self.clear_job(job.id());

        let block = match mined {
            Err(e) => return Err(VoteChainError::Task(e.to_string())),
            Ok(Err(e)) => {
                if matches!(e, VoteChainError::StaleMiningWork) {
                    METRICS.inc_counter(MINING_CANCELLED);
                    info!(height, "mining abandoned: chain moved on");
                }
                return Err(e);
            }
            Ok(Ok(block)) => block,
        };

        let hash = {
            let mut st = self.inner.state.lock();
            if st.ledger.tip_hash() != block.previous_hash {
                METRICS.inc_counter(MINING_CANCELLED);
                return Err(VoteChainError::StaleMiningWork);
            }
            let hash = st.append_local(block.clone())?;
            st.publish_gauges();
            hash
        };
        METRICS.inc_counter(BLOCKS_MINED);
        self.inner.gossip.mark_seen(&block_key(&hash));
        info!(index = block.index, %hash, txs = block.transactions.len(), "block mined");
        self.inner.gossip.broadcast(Message::NewBlock(block.clone()), None).await;
        Ok(Some(block))
    }

    fn clear_job(&self, id: u64) {
        let mut slot = self.inner.mining.lock();
        if slot.as_ref().map(MiningJob::id) == Some(id) {
            *slot = None;
        }
    }

    fn cancel_mining_up_to(&self, height: u64) {
        if let Some(job) = self.inner.mining.lock().as_ref() {
            if job.height() <= height {
                job.cancel();
            }
        }
    }

    fn cancel_mining(&self) {
        if let Some(job) = self.inner.mining.lock().as_ref() {
            job.cancel();
        }
    }

    fn admit(&self, tx: Transaction) -> Result<()> {
        let result = {
            let mut st = self.inner.state.lock();
            let ChainState { ledger, mempool } = &mut *st;
            let result = mempool.submit(tx, ledger, &self.inner.validator);
            METRICS.set_gauge(MEMPOOL_SIZE, mempool.len() as f64);
            result
        };
        match &result {
            Ok(()) => METRICS.inc_counter(TX_ADMITTED),
            Err(VoteChainError::DuplicateVote { .. } | VoteChainError::DuplicateTransaction { .. }) => {
                METRICS.inc_counter(TX_DUPLICATE_DROPPED)
            }
            Err(_) => METRICS.inc_counter(TX_REJECTED),
        }
        result
    }

    // ---------------------------------------------------------------------
    // Peer input
    // ---------------------------------------------------------------------

    /// The seen cache is only written once the transaction is admitted, so a forged copy
    /// carrying a genuine id cannot shadow the real one.
    pub async fn on_foreign_transaction(&self, tx: Transaction, from: &str) -> Result<bool> {
        let key = tx_key(&tx.id);
        if self.inner.gossip.is_seen(&key) {
            debug!(tx = %tx.id, %from, "duplicate transaction dropped");
            return Ok(false);
        }
        self.admit(tx.clone())?;
        self.inner.gossip.mark_seen(&key);
        debug!(tx = %tx.id, %from, "transaction relayed");
        self.inner.gossip.broadcast(Message::NewTransaction(tx), Some(from)).await;
        if self.inner.cfg.auto_mine {
            self.request_mine();
        }
        Ok(true)
    }

    /// Blocks are marked seen after they are appended or their fork is resolved. A block
    /// that fails validation, or whose chain could not be fetched, is considered again
    /// when it next arrives.
    pub async fn on_foreign_block(&self, block: Block, from: &str) -> Result<BlockOutcome> {
        let hash = block.hash();
        let key = block_key(&hash);
        if self.inner.gossip.is_seen(&key) {
            debug!(index = block.index, %from, "duplicate block dropped");
            return Ok(BlockOutcome::Duplicate);
        }

        let disposition = {
            let mut st = self.inner.state.lock();
            let disposition = self.inner.engine.classify(&st.ledger, &block, &hash);
            if disposition == BlockDisposition::ExtendsTip {
                if let Err(e) = st.accept_foreign(&self.inner.engine, block.clone()) {
                    METRICS.inc_counter(BLOCKS_REJECTED);
                    return Err(e);
                }
                st.publish_gauges();
            }
            disposition
        };

        let outcome = match disposition {
            BlockDisposition::Known => BlockOutcome::Duplicate,
            BlockDisposition::ExtendsTip => {
                self.inner.gossip.mark_seen(&key);
                METRICS.inc_counter(BLOCKS_APPENDED);
                self.cancel_mining_up_to(block.index);
                info!(index = block.index, %hash, miner = %block.miner_id, "block appended");
                self.inner.gossip.broadcast(Message::NewBlock(block), Some(from)).await;
                return Ok(BlockOutcome::Appended);
            }
            BlockDisposition::Fork => {
                info!(index = block.index, %from, "block does not extend our tip; requesting chain");
                if self.sync_chain(Some(from)).await? {
                    BlockOutcome::Adopted
                } else {
                    BlockOutcome::Kept
                }
            }
        };
        self.inner.gossip.mark_seen(&key);
        Ok(outcome)
    }

    /// Run fork resolution against `chain`. Returns whether it replaced ours.
    ///
    /// Only a candidate fork choice would prefer gets verified, and verification runs on a
    /// blocking thread with the state lock released.
    pub async fn adopt_chain(&self, chain: Vec<Block>, from: Option<&str>) -> Result<bool> {
        let preferred = compare_chains(self.inner.state.lock().ledger.blocks(), &chain) == ForkChoice::AdoptCandidate;
        if !preferred {
            debug!(from = from.unwrap_or("-"), "kept incumbent chain");
            return Ok(false);
        }
        let engine = self.inner.engine.clone();
        let verified = tokio::task::spawn_blocking(move || engine.verify_chain(chain))
            .await
            .map_err(|e| VoteChainError::Task(e.to_string()))??;
        self.install(verified, from).await
    }

    /// Swap in a verified chain if it still beats ours; the tip may have moved meanwhile.
    async fn install(&self, verified: VerifiedChain, from: Option<&str>) -> Result<bool> {
        let new_tip = {
            let mut st = self.inner.state.lock();
            let replaced = st.adopt_verified(verified);
            st.publish_gauges();
            replaced.then(|| st.ledger.tip().clone())
        };
        match new_tip {
            Some(tip) => {
                self.after_replace(&tip, from).await;
                Ok(true)
            }
            None => {
                debug!(from = from.unwrap_or("-"), "kept incumbent chain");
                Ok(false)
            }
        }
    }

    async fn after_replace(&self, tip: &Block, from: Option<&str>) {
        METRICS.inc_counter(FORKS_ADOPTED);
        self.cancel_mining();
        let hash = tip.hash();
        info!(length = tip.index + 1, tip = %hash, from = from.unwrap_or("-"), "adopted competing chain");
        self.inner.gossip.mark_seen(&block_key(&hash));
        self.inner.gossip.broadcast(Message::NewBlock(tip.clone()), from).await;
    }

    /// CHAIN_REQUEST `preferred` first, then the other neighbours, until one answers.
    pub async fn sync_chain(&self, preferred: Option<&str>) -> Result<bool> {
        let mut sources: Vec<String> = preferred.map(str::to_string).into_iter().collect();
        sources.extend(self.inner.gossip.targets(preferred).await.into_iter().map(|p| p.addr));

        let mut last_err = None;
        for peer in sources {
            match self.inner.transport.request(&peer, Message::ChainRequest).await {
                Ok(Envelope { message: Message::ChainResponse(chain), .. }) => {
                    return self.adopt_chain(chain, Some(&peer)).await;
                }
                Ok(other) => warn!(%peer, kind = ?other.kind(), "unexpected reply to chain request"),
                Err(e) if e.is_network() => {
                    warn!(%peer, "chain request failed: {e}");
                    last_err = Some(e);
                }
                Err(e) => return Err(e),
            }
        }
        match last_err {
            Some(e) => Err(e),
            None => Ok(false),
        }
    }

    /// Ask every neighbour (and `extra`, typically the tracker) for its chain at once and
    /// adopt the heaviest valid one.
    pub async fn bootstrap_sync(&self, extra: Option<&str>) -> Result<bool> {
        let mut sources: Vec<String> = self.inner.gossip.targets(None).await.into_iter().map(|p| p.addr).collect();
        sources.extend(extra.map(str::to_string));

        let replies = join_all(sources.iter().map(|peer| self.inner.transport.request(peer, Message::ChainRequest))).await;
        let chains: Vec<Vec<Block>> = sources
            .iter()
            .zip(replies)
            .filter_map(|(peer, reply)| match reply {
                Ok(Envelope { message: Message::ChainResponse(chain), .. }) => Some(chain),
                Ok(other) => {
                    warn!(%peer, kind = ?other.kind(), "unexpected reply to chain request");
                    None
                }
                Err(e) => {
                    debug!(%peer, "chain request failed: {e}");
                    None
                }
            })
            .collect();
        if chains.is_empty() {
            return Ok(false);
        }

        let incumbent = self.chain();
        let engine = self.inner.engine.clone();
        let best = tokio::task::spawn_blocking(move || engine.verify_best(&incumbent, chains))
            .await
            .map_err(|e| VoteChainError::Task(e.to_string()))?;
        match best {
            Some(verified) => self.install(verified, None).await,
            None => Ok(false),
        }
    }

    pub async fn apply_peer_list(&self, list: PeerListPayload) {
        let own = self.inner.id.clone();
        let peers = list
            .peers
            .into_iter()
            .filter(|(id, _)| *id != own)
            .map(|(id, endpoint)| (id, endpoint.address()));
        self.inner.peers.replace_all(peers).await;
        if let Some(stake) = list.stake {
            self.set_stake(stake);
        }
    }

    // ---------------------------------------------------------------------
    // Read-only snapshots
    // ---------------------------------------------------------------------

    pub fn chain_info(&self) -> ChainInfo {
        let stake = self.stake();
        let st = self.inner.state.lock();
        ChainInfo {
            node_id: self.inner.id.clone(),
            chain_length: st.ledger.len() as u64,
            tip_hash: st.ledger.tip_hash().to_string(),
            total_stake: st.ledger.total_stake(),
            pending_transactions: st.mempool.len(),
            stake,
            difficulty: self.inner.engine.difficulty(stake),
            mining: self.is_mining(),
        }
    }

    pub fn block_detail(&self, index: u64) -> Option<BlockDetail> {
        let st = self.inner.state.lock();
        let block = st.ledger.block(index)?.clone();
        Some(BlockDetail {
            hash: st.ledger.hash_at(index)?.to_string(),
            difficulty: self.inner.engine.difficulty(block.stake_value),
            block,
        })
    }

    pub fn vote_results(&self) -> VoteTally {
        self.inner.state.lock().ledger.vote_tally()
    }

    // ---------------------------------------------------------------------
    // Tracker session
    // ---------------------------------------------------------------------

    pub async fn register(&self, tracker: &str) -> Result<()> {
        let endpoint = PeerEndpoint::parse(&self.inner.id)
            .ok_or_else(|| VoteChainError::Config(format!("peer id {} is not host:port", self.inner.id)))?;
        let reply = self.inner.transport.request(tracker, Message::Register(endpoint)).await?;
        match reply.message {
            Message::PeerList(list) => {
                let stake = list.stake.unwrap_or(0);
                self.apply_peer_list(list).await;
                let peers = self.inner.peers.len().await;
                info!(%tracker, peers, stake, "registered with tracker");
                Ok(())
            }
            other => Err(VoteChainError::Codec(format!("unexpected {:?} in reply to REGISTER", other.kind()))),
        }
    }

    /// Retry registration with exponential backoff. False if shut down first.
    async fn register_with_backoff(&self, tracker: &str, shutdown: &mut watch::Receiver<bool>) -> bool {
        let max = Duration::from_millis(self.inner.cfg.register_retry_max_ms.max(1));
        let mut delay = Duration::from_millis(self.inner.cfg.register_retry_base_ms.max(1));
        loop {
            match self.register(tracker).await {
                Ok(()) => return true,
                Err(e) => warn!(%tracker, retry_in_ms = delay.as_millis() as u64, "registration failed: {e}"),
            }
            tokio::select! {
                _ = sleep(delay) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return false;
                    }
                }
            }
            delay = (delay * 2).min(max);
        }
    }

    pub async fn send_heartbeat(&self, tracker: &str) -> Result<()> {
        let payload = {
            let st = self.inner.state.lock();
            HeartbeatPayload {
                chain_length: st.ledger.len() as u64,
                last_hash: st.ledger.tip_hash().to_string(),
                chain: st.ledger.blocks().to_vec(),
            }
        };
        self.inner.transport.send(tracker, Message::Heartbeat(payload)).await
    }

    /// GET_MINER round trip; stores and returns the stake the tracker holds for us.
    pub async fn refresh_stake(&self, tracker: &str) -> Result<u64> {
        match self.inner.transport.request(tracker, Message::GetMiner(None)).await?.message {
            Message::GetMiner(Some(info)) => {
                self.set_stake(info.stake_value);
                Ok(info.stake_value)
            }
            other => Err(VoteChainError::Codec(format!("unexpected {:?} in reply to GET_MINER", other.kind()))),
        }
    }

    async fn tracker_session(&self, tracker: &str, shutdown: &mut watch::Receiver<bool>) {
        if !self.register_with_backoff(tracker, shutdown).await {
            return;
        }
        if let Err(e) = self.bootstrap_sync(Some(tracker)).await {
            warn!("initial sync failed: {e}");
        }

        let mut ticker = tokio::time::interval(self.inner.cfg.heartbeat_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }
            if let Err(e) = self.send_heartbeat(tracker).await {
                warn!(%tracker, "heartbeat failed: {e}");
                continue;
            }
            if let Err(e) = self.refresh_stake(tracker).await {
                // the tracker forgets peers it evicted; announce ourselves again
                warn!(%tracker, "stake refresh failed: {e}; re-registering");
                if let Err(e) = self.register(tracker).await {
                    warn!(%tracker, "re-registration failed: {e}");
                }
            }
        }
        debug!("tracker session ended");
    }

    /// Bind the listener and spawn the background tasks.
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

        if let Some(tracker) = cfg.tracker_addr.clone() {
            let node = self.clone();
            let mut rx = shutdown_rx.clone();
            svc.attach(tokio::spawn(async move {
                node.tracker_session(&tracker, &mut rx).await;
                Ok(())
            }));
        }

        if let Some(rpc_addr) = cfg.rpc_addr.clone() {
            let handle = crate::rpc::start_rpc_server(&rpc_addr, self.clone()).await?;
            let mut rx = shutdown_rx.clone();
            svc.attach(tokio::spawn(async move {
                wait_for_shutdown(&mut rx).await;
                let _ = handle.stop();
                handle.stopped().await;
                Ok(())
            }));
        }

        info!(id = %self.inner.id, voter = %self.public_key(), "node started");
        Ok(svc)
    }
}

#[async_trait]
impl MessageHandler for Node {
    async fn handle(&self, envelope: Envelope) -> Option<Message> {
        let Envelope { sender, message, .. } = envelope;
        match message {
            Message::NewBlock(block) => {
                if let Err(e) = self.on_foreign_block(block, &sender).await {
                    warn!(%sender, "block not accepted: {e}");
                }
                None
            }
            Message::NewTransaction(tx) => {
                match self.on_foreign_transaction(tx, &sender).await {
                    Ok(_) => {}
                    Err(e @ (VoteChainError::DuplicateVote { .. } | VoteChainError::DuplicateTransaction { .. })) => {
                        debug!(%sender, "{e}")
                    }
                    Err(e) => warn!(%sender, "transaction rejected: {e}"),
                }
                None
            }
            Message::ChainRequest => Some(Message::ChainResponse(self.chain())),
            Message::ChainResponse(chain) => {
                if let Err(e) = self.adopt_chain(chain, Some(&sender)).await {
                    warn!(%sender, "chain rejected: {e}");
                }
                None
            }
            Message::PeerList(list) => {
                self.apply_peer_list(list).await;
                None
            }
            Message::GetVoteResults(_) => Some(Message::GetVoteResults(Some(self.vote_results()))),
            other => {
                warn!(%sender, kind = ?other.kind(), "message kind not served by peers");
                None
            }
        }
    }
}
