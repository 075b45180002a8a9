//! Read-only views of the chain handed out to RPC callers and peers.

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use crate::ledger::block::Block;
use crate::ledger::transaction::Transaction;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChainInfo {
    pub node_id: String,
    pub chain_length: u64,
    pub tip_hash: String,
    pub total_stake: u64,
    pub pending_transactions: usize,
    pub stake: u64,
    pub difficulty: u32,
    pub mining: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BlockDetail {
    pub hash: String,
    pub difficulty: u32,
    #[serde(flatten)]
    pub block: Block,
}

/// Ballot counts per candidate over a confirmed chain.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VoteTally {
    pub results: BTreeMap<String, u64>,
    pub total_votes: u64,
    pub chain_length: u64,
}

impl VoteTally {
    pub fn from_transactions<'a>(txs: impl IntoIterator<Item = &'a Transaction>, chain_length: u64) -> Self {
        let mut results = BTreeMap::new();
        let mut total_votes = 0;
        for tx in txs {
            *results.entry(tx.vote_data.clone()).or_insert(0) += 1;
            total_votes += 1;
        }
        Self { results, total_votes, chain_length }
    }
}
