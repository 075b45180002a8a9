//! Ingest: admission checks for votes arriving from RPC or the network.
//!
//! Checks run cheapest first: shape, then id and one-vote-per-voter uniqueness against
//! the chain and the pool, then the signature.

use std::sync::Arc;
use crate::crypto::SigningService;
use crate::ledger::{Ledger, Transaction};
use crate::txpool::pool::Mempool;
use crate::utils::{Result, VoteChainError};

/// Trait for pluggable admission rules.
pub trait TxValidator: Send + Sync + 'static {
    fn validate(&self, tx: &Transaction, ledger: &Ledger, mempool: &Mempool) -> Result<()>;
}

pub struct VoteValidator {
    signer: Arc<dyn SigningService>,
}

impl VoteValidator {
    pub fn new(signer: Arc<dyn SigningService>) -> Self {
        Self { signer }
    }
}

impl TxValidator for VoteValidator {
    fn validate(&self, tx: &Transaction, ledger: &Ledger, mempool: &Mempool) -> Result<()> {
        tx.check_well_formed()?;
        if ledger.contains_transaction(&tx.id) || mempool.contains(&tx.id) {
            return Err(VoteChainError::DuplicateTransaction { tx_id: tx.id.clone() });
        }
        if ledger.has_voted(&tx.voter_id) || mempool.has_pending_vote(&tx.voter_id) {
            return Err(VoteChainError::DuplicateVote { voter_id: tx.voter_id.clone() });
        }
        if !tx.verify_signature(self.signer.as_ref()) {
            return Err(VoteChainError::BadSignature { tx_id: tx.id.clone() });
        }
        Ok(())
    }
}
