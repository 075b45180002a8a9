//! Proof-of-work search.
//!
//! The search is CPU-bound and meant to run on a blocking thread. It polls a
//! cancellation token every `check_interval` nonces so a foreign block landing on the
//! same height can abort it.

use std::sync::atomic::{AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use crate::consensus::difficulty::DifficultyCurve;
use crate::ledger::{Block, Transaction};
use crate::utils::{now_millis, Result, VoteChainError};

#[derive(Debug, Clone)]
pub struct ProofOfWork {
    curve: DifficultyCurve,
    check_interval: u64,
}

impl ProofOfWork {
    pub fn new(curve: DifficultyCurve, check_interval: u64) -> Self {
        Self { curve, check_interval: check_interval.max(1) }
    }

    /// Mine a successor of `previous` holding `pending`. Returns `StaleMiningWork` when
    /// cancelled before a valid nonce turns up.
    pub fn mine(
        &self,
        previous: &Block,
        pending: Vec<Transaction>,
        miner_id: &str,
        stake: u64,
        cancel: &CancellationToken,
    ) -> Result<Block> {
        let template = Block::template(previous, previous.hash(), pending, miner_id, stake, now_millis());
        self.solve(template, cancel)
    }

    pub fn solve(&self, mut block: Block, cancel: &CancellationToken) -> Result<Block> {
        let zeros = self.curve.difficulty(block.stake_value);
        debug!(index = block.index, difficulty = zeros, "mining started");
        let mut nonce: u64 = 0;
        loop {
            if nonce % self.check_interval == 0 && cancel.is_cancelled() {
                debug!(index = block.index, tried = nonce, "mining cancelled");
                return Err(VoteChainError::StaleMiningWork);
            }
            block.nonce = nonce;
            if self.curve.is_satisfied(&block.hash(), block.stake_value) {
                debug!(index = block.index, nonce, "nonce found");
                return Ok(block);
            }
            nonce = nonce.checked_add(1).ok_or(VoteChainError::StaleMiningWork)?;
        }
    }
}

static NEXT_JOB_ID: AtomicU64 = AtomicU64::new(1);

/// The one in-flight mining attempt of a node.
#[derive(Debug, Clone)]
pub struct MiningJob {
    id: u64,
    height: u64,
    cancel: CancellationToken,
}

impl MiningJob {
    pub fn new(height: u64) -> Self {
        Self {
            id: NEXT_JOB_ID.fetch_add(1, Ordering::Relaxed),
            height,
            cancel: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Height of the block being mined.
    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
