//! Merkle root over a block's transaction list.
//!
//! Leaves are the hex SHA-256 of each transaction's canonical encoding. A parent is the
//! SHA-256 of its two children's hex strings concatenated. An odd node at any level is
//! paired with itself, and an empty list has the root `sha256("")`.

use sha2::{Digest, Sha256};
use crate::ledger::transaction::Transaction;

/// Hex-encoded SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Root of the empty transaction list.
pub fn empty_root() -> String {
    sha256_hex(b"")
}

pub fn compute_merkle_root(transactions: &[Transaction]) -> String {
    merkle_root_of_hashes(transactions.iter().map(Transaction::hash).collect())
}

pub fn merkle_root_of_hashes(mut level: Vec<String>) -> String {
    if level.is_empty() {
        return empty_root();
    }
    while level.len() > 1 {
        if level.len() % 2 == 1 {
            if let Some(last) = level.last().cloned() {
                level.push(last);
            }
        }
        level = level
            .chunks(2)
            .map(|pair| {
                let mut joined = String::with_capacity(pair[0].len() * 2);
                joined.push_str(&pair[0]);
                joined.push_str(&pair[1]);
                sha256_hex(joined.as_bytes())
            })
            .collect();
    }
    level.swap_remove(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(id: &str, voter: &str) -> Transaction {
        Transaction {
            id: id.into(),
            voter_id: voter.into(),
            vote_data: "X".into(),
            signature: "sig".into(),
            timestamp: 1,
        }
    }

    #[test]
    fn empty_list_has_well_known_root() {
        assert_eq!(
            compute_merkle_root(&[]),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn single_leaf_is_its_own_root() {
        let t = tx("1", "a");
        assert_eq!(compute_merkle_root(std::slice::from_ref(&t)), t.hash());
    }

    #[test]
    fn order_sensitive_and_deterministic() {
        let (a, b, c) = (tx("1", "a"), tx("2", "b"), tx("3", "c"));
        let forward = compute_merkle_root(&[a.clone(), b.clone(), c.clone()]);
        assert_eq!(forward, compute_merkle_root(&[a.clone(), b.clone(), c.clone()]));
        assert_ne!(forward, compute_merkle_root(&[b, a, c]));
    }

    #[test]
    fn odd_level_duplicates_last_node() {
        let (a, b, c) = (tx("1", "a"), tx("2", "b"), tx("3", "c"));
        let odd = compute_merkle_root(&[a.clone(), b.clone(), c.clone()]);
        let padded = merkle_root_of_hashes(vec![a.hash(), b.hash(), c.hash(), c.hash()]);
        assert_eq!(odd, padded);
    }

    #[test]
    fn signature_is_not_part_of_the_leaf() {
        let a = tx("1", "a");
        let mut resigned = a.clone();
        resigned.signature = "other".into();
        assert_eq!(compute_merkle_root(&[a]), compute_merkle_root(&[resigned]));
    }
}
