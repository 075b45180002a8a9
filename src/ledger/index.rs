use std::collections::HashSet;
use crate::ledger::block::Block;

/// Lookup sets over the confirmed chain: who voted, which transactions landed, and
/// which block hashes we hold.
#[derive(Debug, Clone, Default)]
pub struct ChainIndex {
    voters: HashSet<String>,
    tx_ids: HashSet<String>,
    blocks: HashSet<String>,
}

impl ChainIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rebuild<'a>(chain: impl IntoIterator<Item = (&'a Block, &'a String)>) -> Self {
        let mut index = Self::new();
        for (block, hash) in chain {
            index.add(block, hash);
        }
        index
    }

    pub fn add(&mut self, block: &Block, hash: &str) {
        self.blocks.insert(hash.to_string());
        for tx in &block.transactions {
            self.voters.insert(tx.voter_id.clone());
            self.tx_ids.insert(tx.id.clone());
        }
    }

    pub fn has_voted(&self, voter_id: &str) -> bool {
        self.voters.contains(voter_id)
    }

    pub fn contains_transaction(&self, tx_id: &str) -> bool {
        self.tx_ids.contains(tx_id)
    }

    pub fn contains_block(&self, block_hash: &str) -> bool {
        self.blocks.contains(block_hash)
    }
}
