//! Consensus module (PoW + stake-adjusted difficulty + fork choice)
//!
//! Public surface:
//! - ConsensusEngine: mines, classifies incoming blocks, accepts them and verifies competing chains
//! - difficulty, pow, fork_choice, stake

pub mod difficulty;
pub mod fork_choice;
pub mod pow;
pub mod stake;

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use crate::crypto::SigningService;
use crate::ledger::{Block, Ledger, Transaction, VerifiedChain};
use crate::utils::{Result, VoteChainError};

pub use difficulty::DifficultyCurve;
pub use fork_choice::{compare_chains, select_chain, ForkChoice};
pub use pow::{MiningJob, ProofOfWork};
pub use stake::{LinearStakePolicy, StakeEvent, StakeLedger, StakePolicy};

/// Where an incoming block sits relative to our chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockDisposition {
    /// already part of the chain
    Known,
    /// links directly onto the current tip
    ExtendsTip,
    /// anything else: a competing branch or a chain we are behind on
    Fork,
}

/// ConsensusEngine wires the difficulty curve, the PoW search and signature checks.
#[derive(Clone)]
pub struct ConsensusEngine {
    curve: DifficultyCurve,
    pow: ProofOfWork,
    signer: Arc<dyn SigningService>,
}

impl ConsensusEngine {
    pub fn new(curve: DifficultyCurve, check_interval: u64, signer: Arc<dyn SigningService>) -> Self {
        Self { curve, pow: ProofOfWork::new(curve, check_interval), signer }
    }

    pub fn difficulty(&self, stake: u64) -> u32 {
        self.curve.difficulty(stake)
    }

    pub fn signer(&self) -> &dyn SigningService {
        self.signer.as_ref()
    }

    /// Blocking. Run on a blocking thread.
    pub fn mine(
        &self,
        previous: &Block,
        pending: Vec<Transaction>,
        miner_id: &str,
        stake: u64,
        cancel: &CancellationToken,
    ) -> Result<Block> {
        self.pow.mine(previous, pending, miner_id, stake, cancel)
    }

    pub fn classify(&self, ledger: &Ledger, block: &Block, hash: &str) -> BlockDisposition {
        if ledger.contains_block(hash) {
            BlockDisposition::Known
        } else if block.index == ledger.tip().index + 1 && block.previous_hash == ledger.tip_hash() {
            BlockDisposition::ExtendsTip
        } else {
            BlockDisposition::Fork
        }
    }

    /// Verify every signature in `block`, then append it.
    pub fn accept_block(&self, ledger: &mut Ledger, block: Block) -> Result<String> {
        if let Some(tx) = block.transactions.iter().find(|tx| !tx.verify_signature(self.signer())) {
            return Err(VoteChainError::InvalidBlock {
                index: block.index,
                reason: format!("bad signature on transaction {}", tx.id),
            });
        }
        ledger.append(block)
    }

    /// Full validation of a foreign chain: structure, work and every signature. CPU-bound;
    /// callers on the runtime move it to a blocking thread and take no lock around it.
    pub fn verify_chain(&self, chain: Vec<Block>) -> Result<VerifiedChain> {
        let verified = Ledger::verify(chain, &self.curve)?;
        for block in verified.blocks() {
            if let Some(tx) = block.transactions.iter().find(|tx| !tx.verify_signature(self.signer())) {
                return Err(VoteChainError::ChainValidationFailure {
                    index: block.index,
                    reason: format!("bad signature on transaction {}", tx.id),
                });
            }
        }
        Ok(verified)
    }

    /// Verify every candidate, drop the invalid ones and return the one fork choice ranks
    /// above `incumbent` and the others. `None` when the incumbent survives.
    pub fn verify_best(&self, incumbent: &[Block], candidates: Vec<Vec<Block>>) -> Option<VerifiedChain> {
        let mut valid: Vec<VerifiedChain> = candidates
            .into_iter()
            .filter_map(|chain| self.verify_chain(chain).ok())
            .collect();
        let views: Vec<&[Block]> = valid.iter().map(VerifiedChain::blocks).collect();
        let winner = select_chain(incumbent, &views)?;
        Some(valid.swap_remove(winner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Ed25519Signer;
    use crate::ledger::tests::{easy_curve, mine_on, vote};

    fn engine() -> ConsensusEngine {
        ConsensusEngine::new(easy_curve(), 64, Arc::new(Ed25519Signer))
    }

    #[test]
    fn classify_sorts_blocks() {
        let engine = engine();
        let mut ledger = Ledger::new(easy_curve());
        let b1 = mine_on(ledger.blocks(), vec![vote("A")], "m", 1);
        assert_eq!(engine.classify(&ledger, &b1, &b1.hash()), BlockDisposition::ExtendsTip);
        engine.accept_block(&mut ledger, b1.clone()).unwrap();
        assert_eq!(engine.classify(&ledger, &b1, &b1.hash()), BlockDisposition::Known);

        let rival = mine_on(&[Block::genesis()], vec![vote("B")], "p", 1);
        assert_eq!(engine.classify(&ledger, &rival, &rival.hash()), BlockDisposition::Fork);
    }

    #[test]
    fn forged_signature_is_rejected_before_append() {
        let engine = engine();
        let mut ledger = Ledger::new(easy_curve());
        let mut tx = vote("A");
        tx.signature = "00".repeat(64);
        let block = mine_on(ledger.blocks(), vec![tx], "m", 1);
        assert!(matches!(
            engine.accept_block(&mut ledger, block),
            Err(VoteChainError::InvalidBlock { index: 1, .. })
        ));
    }

    #[test]
    fn verify_chain_checks_signatures() {
        let engine = engine();
        let mut chain = vec![Block::genesis()];
        chain.push(mine_on(&chain, vec![vote("A")], "p", 1));
        assert_eq!(engine.verify_chain(chain.clone()).unwrap().blocks().len(), 2);

        // a swapped signature leaves the block hash and merkle root intact
        chain[1].transactions[0].signature = vote("A").signature;
        assert!(matches!(
            engine.verify_chain(chain),
            Err(VoteChainError::ChainValidationFailure { index: 1, .. })
        ));
    }

    #[test]
    fn verify_best_picks_heaviest_valid_chain() {
        let engine = engine();
        let mut ledger = Ledger::new(easy_curve());
        let mut a = vec![Block::genesis()];
        a.push(mine_on(&a, vec![vote("A")], "p", 1));
        let mut b = a.clone();
        b.push(mine_on(&b, vec![vote("B")], "p", 1));
        let mut broken = b.clone();
        broken.push(mine_on(&broken, vec![vote("C")], "p", 1));
        broken[3].merkle_root = "ff".into();

        let best = engine.verify_best(ledger.blocks(), vec![a, broken, b.clone()]).expect("a winner");
        assert!(ledger.adopt(best));
        assert_eq!(ledger.tip_hash(), b[2].hash());
        assert!(engine.verify_best(ledger.blocks(), vec![b]).is_none());
    }
}
