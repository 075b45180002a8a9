#![allow(dead_code)]

use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use votechain::consensus::{DifficultyCurve, ProofOfWork};
use votechain::crypto::{Ed25519Signer, Keypair};
use votechain::ledger::{Block, Transaction};
use votechain::network::Topology;
use votechain::node::{Node, NodeConfig};

/// One leading zero whatever the stake.
pub fn easy_curve() -> DifficultyCurve {
    DifficultyCurve { base: 1, min: 1, max: 2, stake_step: 1 }
}

/// Out of reach at stake 0, trivial from stake 11 upwards.
pub fn steep_curve() -> DifficultyCurve {
    DifficultyCurve { base: 12, min: 1, max: 12, stake_step: 1 }
}

pub fn free_addr() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().to_string()
}

pub fn vote(candidate: &str) -> Transaction {
    Transaction::signed(candidate, &Keypair::generate(), &Ed25519Signer).unwrap()
}

pub fn mine_on(curve: DifficultyCurve, chain: &[Block], txs: Vec<Transaction>, miner: &str, stake: u64) -> Block {
    ProofOfWork::new(curve, 64)
        .mine(chain.last().unwrap(), txs, miner, stake, &CancellationToken::new())
        .unwrap()
}

/// Node with no tracker and no neighbours; nothing is bound until `start`.
pub fn offline_node(curve: DifficultyCurve) -> Node {
    let cfg = NodeConfig {
        bind_addr: free_addr(),
        tracker_addr: None,
        difficulty: curve,
        mining_check_interval: 16,
        ..NodeConfig::default()
    };
    Node::with_topology(cfg, Topology::default()).unwrap()
}

/// Poll `check` until it holds or `limit` elapses.
pub async fn eventually<F, Fut>(limit: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + limit;
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}
