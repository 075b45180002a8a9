use serde::{Deserialize, Serialize};
use crate::ledger::merkle::{compute_merkle_root, empty_root, sha256_hex};
use crate::ledger::transaction::Transaction;

pub const GENESIS_PREVIOUS_HASH: &str = "0";
pub const GENESIS_MINER: &str = "genesis";

/// A block of confirmed votes. The hash is derived from the header fields and never stored,
/// so a block received over the wire cannot lie about it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub index: u64,
    pub timestamp: u64,
    pub previous_hash: String,
    pub merkle_root: String,
    pub nonce: u64,
    pub miner_id: String,
    /// miner's stake when it produced this block; sets the block's difficulty
    pub stake_value: u64,
    pub transactions: Vec<Transaction>,
}

/// Hashed header fields, declared in sorted key order.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Header<'a> {
    index: u64,
    merkle_root: &'a str,
    miner_id: &'a str,
    nonce: u64,
    previous_hash: &'a str,
    stake_value: u64,
    timestamp: u64,
}

impl Block {
    /// Fixed genesis shared by every participant. Exempt from proof-of-work.
    pub fn genesis() -> Self {
        Block {
            index: 0,
            timestamp: 0,
            previous_hash: GENESIS_PREVIOUS_HASH.to_string(),
            merkle_root: empty_root(),
            nonce: 0,
            miner_id: GENESIS_MINER.to_string(),
            stake_value: 0,
            transactions: Vec::new(),
        }
    }

    /// Unsolved successor of `previous` carrying `transactions`, nonce zero.
    pub fn template(
        previous: &Block,
        previous_hash: String,
        transactions: Vec<Transaction>,
        miner_id: impl Into<String>,
        stake_value: u64,
        timestamp: u64,
    ) -> Self {
        Block {
            index: previous.index + 1,
            timestamp,
            previous_hash,
            merkle_root: compute_merkle_root(&transactions),
            nonce: 0,
            miner_id: miner_id.into(),
            stake_value,
            transactions,
        }
    }

    /// Sorted-key compact JSON of the seven header fields.
    pub fn header_bytes(&self) -> Vec<u8> {
        let header = Header {
            index: self.index,
            merkle_root: &self.merkle_root,
            miner_id: &self.miner_id,
            nonce: self.nonce,
            previous_hash: &self.previous_hash,
            stake_value: self.stake_value,
            timestamp: self.timestamp,
        };
        // strings and integers always serialize
        serde_json::to_vec(&header).unwrap_or_default()
    }

    pub fn hash(&self) -> String {
        sha256_hex(&self.header_bytes())
    }

    pub fn recompute_merkle_root(&self) -> String {
        compute_merkle_root(&self.transactions)
    }

    pub fn is_genesis(&self) -> bool {
        *self == Block::genesis()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_is_fixed() {
        let a = Block::genesis();
        let b = Block::genesis();
        assert_eq!(a.hash(), b.hash());
        assert!(a.is_genesis());
        assert_eq!(a.merkle_root, empty_root());
    }

    #[test]
    fn header_encoding_is_sorted_compact_json() {
        let expected = format!(
            r#"{{"index":0,"merkleRoot":"{}","minerId":"genesis","nonce":0,"previousHash":"0","stakeValue":0,"timestamp":0}}"#,
            empty_root()
        );
        assert_eq!(String::from_utf8(Block::genesis().header_bytes()).unwrap(), expected);
    }

    #[test]
    fn hash_covers_nonce_and_stake() {
        let g = Block::genesis();
        let mut block = Block::template(&g, g.hash(), vec![], "miner", 3, 10);
        let h0 = block.hash();
        block.nonce += 1;
        let h1 = block.hash();
        assert_ne!(h0, h1);
        block.stake_value = 4;
        assert_ne!(h1, block.hash());
    }

    #[test]
    fn template_links_to_previous() {
        let g = Block::genesis();
        let block = Block::template(&g, g.hash(), vec![], "miner", 0, 10);
        assert_eq!(block.index, 1);
        assert_eq!(block.previous_hash, g.hash());
        assert_eq!(block.merkle_root, block.recompute_merkle_root());
        assert!(!block.is_genesis());
    }
}
