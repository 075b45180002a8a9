//! Mempool: verified votes waiting for a block.
//!
//! Data model:
//! - entries: tx id -> transaction
//! - order: FIFO of tx ids, the order blocks pick them up in
//! - voters: voter id -> pending tx id, the one-ballot-per-voter guard
//!
//! The pool is plain data; the node keeps it behind the same lock as the ledger so
//! admission and reconciliation always see a consistent chain.

use std::collections::{HashMap, VecDeque};
use tracing::debug;
use crate::ledger::{Ledger, Transaction};
use crate::txpool::ingest::TxValidator;
use crate::utils::{Result, VoteChainError};

#[derive(Debug, Clone)]
pub struct Mempool {
    entries: HashMap<String, Transaction>,
    order: VecDeque<String>,
    voters: HashMap<String, String>,
    capacity: usize,
}

impl Mempool {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            voters: HashMap::new(),
            capacity,
        }
    }

    /// Validate and admit `tx`. Ids stay unique whatever the validator checks.
    pub fn submit(&mut self, tx: Transaction, ledger: &Ledger, validator: &dyn TxValidator) -> Result<()> {
        validator.validate(&tx, ledger, self)?;
        if self.entries.contains_key(&tx.id) {
            return Err(VoteChainError::DuplicateTransaction { tx_id: tx.id });
        }
        if self.entries.len() >= self.capacity {
            return Err(VoteChainError::MempoolFull { capacity: self.capacity });
        }
        self.voters.insert(tx.voter_id.clone(), tx.id.clone());
        self.order.push_back(tx.id.clone());
        self.entries.insert(tx.id.clone(), tx);
        Ok(())
    }

    /// Up to `max` pending transactions, oldest first. Nothing is removed; confirmed
    /// transactions leave through `reconcile`.
    pub fn take(&self, max: usize) -> Vec<Transaction> {
        self.order
            .iter()
            .filter_map(|id| self.entries.get(id))
            .take(max)
            .cloned()
            .collect()
    }

    /// Drop every transaction the ledger has confirmed or whose voter already voted on
    /// chain. Returns how many were dropped.
    pub fn reconcile(&mut self, ledger: &Ledger) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|id, tx| !ledger.contains_transaction(id) && !ledger.has_voted(&tx.voter_id));
        let entries = &self.entries;
        self.order.retain(|id| entries.contains_key(id));
        self.voters.retain(|_, id| entries.contains_key(id));
        let dropped = before - self.entries.len();
        if dropped > 0 {
            debug!(dropped, remaining = self.entries.len(), "mempool reconciled");
        }
        dropped
    }

    pub fn contains(&self, tx_id: &str) -> bool {
        self.entries.contains_key(tx_id)
    }

    pub fn has_pending_vote(&self, voter_id: &str) -> bool {
        self.voters.contains_key(voter_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
