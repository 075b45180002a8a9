//! Ledger: the locally held chain of blocks.
//!
//! - Append: validate and attach a block to the tip
//! - Validate: check a whole candidate chain from genesis
//! - Replace: swap in a candidate when fork choice prefers it
//!
//! Signatures are not checked here; the consensus engine verifies them before a foreign
//! block or chain reaches the ledger.

pub mod block;
pub mod index;
pub mod merkle;
pub mod snapshot;
pub mod transaction;

use std::collections::HashSet;
use crate::consensus::difficulty::DifficultyCurve;
use crate::consensus::fork_choice::{compare_chains, ForkChoice};
use crate::utils::{Result, VoteChainError};

pub use block::Block;
pub use index::ChainIndex;
pub use snapshot::{BlockDetail, ChainInfo, VoteTally};
pub use transaction::Transaction;

#[derive(Debug, Clone)]
pub struct Ledger {
    blocks: Vec<Block>,
    hashes: Vec<String>,
    index: ChainIndex,
    curve: DifficultyCurve,
}

impl Ledger {
    /// A chain holding only genesis.
    pub fn new(curve: DifficultyCurve) -> Self {
        let genesis = Block::genesis();
        let hash = genesis.hash();
        let mut index = ChainIndex::new();
        index.add(&genesis, &hash);
        Self { blocks: vec![genesis], hashes: vec![hash], index, curve }
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block(&self, index: u64) -> Option<&Block> {
        usize::try_from(index).ok().and_then(|i| self.blocks.get(i))
    }

    pub fn hash_at(&self, index: u64) -> Option<&str> {
        usize::try_from(index).ok().and_then(|i| self.hashes.get(i)).map(String::as_str)
    }

    pub fn tip(&self) -> &Block {
        // never empty: constructed with genesis and only replaced by validated chains
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn tip_hash(&self) -> &str {
        &self.hashes[self.hashes.len() - 1]
    }

    pub fn contains_block(&self, hash: &str) -> bool {
        self.index.contains_block(hash)
    }

    pub fn contains_transaction(&self, tx_id: &str) -> bool {
        self.index.contains_transaction(tx_id)
    }

    pub fn has_voted(&self, voter_id: &str) -> bool {
        self.index.has_voted(voter_id)
    }

    pub fn total_stake(&self) -> u64 {
        total_stake(&self.blocks)
    }

    pub fn transactions(&self) -> impl Iterator<Item = &Transaction> {
        self.blocks.iter().flat_map(|b| b.transactions.iter())
    }

    pub fn confirmed_transaction_ids(&self) -> HashSet<&str> {
        self.transactions().map(|tx| tx.id.as_str()).collect()
    }

    pub fn vote_tally(&self) -> VoteTally {
        VoteTally::from_transactions(self.transactions(), self.len() as u64)
    }

    /// Validate `block` against the tip and attach it. Returns the new tip hash.
    pub fn append(&mut self, block: Block) -> Result<String> {
        let hash = check_block(&block, self.tip(), self.tip_hash(), &self.index, &self.curve)
            .map_err(|reason| VoteChainError::InvalidBlock { index: block.index, reason })?;
        self.index.add(&block, &hash);
        self.blocks.push(block);
        self.hashes.push(hash.clone());
        Ok(hash)
    }

    /// Check a full candidate chain from genesis. Reports the first failing index.
    pub fn validate_chain(candidate: &[Block], curve: &DifficultyCurve) -> Result<Vec<String>> {
        let fail = |index: u64, reason: String| VoteChainError::ChainValidationFailure { index, reason };

        let genesis = candidate.first().ok_or_else(|| fail(0, "empty chain".into()))?;
        if !genesis.is_genesis() {
            return Err(fail(0, "genesis mismatch".into()));
        }

        let mut hashes = Vec::with_capacity(candidate.len());
        hashes.push(genesis.hash());
        let mut index = ChainIndex::new();
        index.add(genesis, &hashes[0]);

        for (pos, pair) in candidate.windows(2).enumerate() {
            let (prev, block) = (&pair[0], &pair[1]);
            let hash = check_block(block, prev, &hashes[pos], &index, curve)
                .map_err(|reason| fail(pos as u64 + 1, reason))?;
            index.add(block, &hash);
            hashes.push(hash);
        }
        Ok(hashes)
    }

    /// Validate `candidate` and keep its block hashes for a later `adopt`.
    pub fn verify(candidate: Vec<Block>, curve: &DifficultyCurve) -> Result<VerifiedChain> {
        let hashes = Self::validate_chain(&candidate, curve)?;
        Ok(VerifiedChain { blocks: candidate, hashes })
    }

    /// Swap in an already verified chain if fork choice prefers it. Cheap: no hashing.
    pub fn adopt(&mut self, chain: VerifiedChain) -> bool {
        if compare_chains(&self.blocks, &chain.blocks) != ForkChoice::AdoptCandidate {
            return false;
        }
        self.index = ChainIndex::rebuild(chain.blocks.iter().zip(chain.hashes.iter()));
        self.blocks = chain.blocks;
        self.hashes = chain.hashes;
        true
    }
}

/// A chain that passed `Ledger::validate_chain`, with the hash of every block.
#[derive(Debug, Clone)]
pub struct VerifiedChain {
    blocks: Vec<Block>,
    hashes: Vec<String>,
}

impl VerifiedChain {
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Blocks paired with their hashes, genesis first.
    pub fn iter(&self) -> impl Iterator<Item = (&Block, &str)> {
        self.blocks.iter().zip(self.hashes.iter().map(String::as_str))
    }
}

pub fn total_stake(chain: &[Block]) -> u64 {
    chain.iter().fold(0u64, |acc, b| acc.saturating_add(b.stake_value))
}

/// Structural checks for `block` on top of `prev`; returns the block's hash.
fn check_block(
    block: &Block,
    prev: &Block,
    prev_hash: &str,
    index: &ChainIndex,
    curve: &DifficultyCurve,
) -> std::result::Result<String, String> {
    if block.index != prev.index + 1 {
        return Err(format!("expected index {}, got {}", prev.index + 1, block.index));
    }
    if block.previous_hash != prev_hash {
        return Err("previous hash does not match".into());
    }
    if block.merkle_root != block.recompute_merkle_root() {
        return Err("merkle root does not match transactions".into());
    }
    let hash = block.hash();
    let required = curve.difficulty(block.stake_value);
    if !curve.is_satisfied(&hash, block.stake_value) {
        return Err(format!("hash does not meet difficulty {required}"));
    }

    let mut voters = HashSet::new();
    let mut ids = HashSet::new();
    for tx in &block.transactions {
        tx.check_well_formed().map_err(|e| e.to_string())?;
        if index.contains_transaction(&tx.id) || !ids.insert(tx.id.as_str()) {
            return Err(format!("duplicate transaction {}", tx.id));
        }
        if index.has_voted(&tx.voter_id) || !voters.insert(tx.voter_id.as_str()) {
            return Err(format!("voter {} votes twice", tx.voter_id));
        }
    }
    Ok(hash)
}
