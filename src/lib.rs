//! votechain: a peer-to-peer vote ledger.
//!
//! Peers keep a proof-of-work chain of signed vote transactions, gossip
//! blocks and transactions to their topology neighbours, and register with a
//! tracker that hands out peer lists, audits heartbeated chains and keeps
//! per-peer stake. Stake lowers a miner's difficulty target.

pub mod consensus;
pub mod crypto;
pub mod ledger;
pub mod network;
pub mod node;
pub mod rpc;
pub mod tracker;
pub mod txpool;
pub mod utils;
