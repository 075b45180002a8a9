//! Fork choice between two validated chains.
//!
//! The longer chain wins. At equal length the chain with the higher summed block stake
//! wins. Anything else keeps the incumbent, so the rule is a strict total order on
//! (length, stake) with ties resolved in favour of what we already hold.

use std::cmp::Ordering;
use crate::ledger::{total_stake, Block};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForkChoice {
    KeepIncumbent,
    AdoptCandidate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ChainWeight {
    pub length: usize,
    pub stake: u64,
}

impl ChainWeight {
    pub fn of(chain: &[Block]) -> Self {
        Self { length: chain.len(), stake: total_stake(chain) }
    }
}

pub fn compare_chains(incumbent: &[Block], candidate: &[Block]) -> ForkChoice {
    match ChainWeight::of(candidate).cmp(&ChainWeight::of(incumbent)) {
        Ordering::Greater => ForkChoice::AdoptCandidate,
        Ordering::Equal | Ordering::Less => ForkChoice::KeepIncumbent,
    }
}

/// Fold `compare_chains` over several candidates. Returns the position of the winning
/// candidate, or `None` when the incumbent survives all of them. Among equally weighted
/// candidates the earliest one wins.
pub fn select_chain<'a>(incumbent: &'a [Block], candidates: &[&'a [Block]]) -> Option<usize> {
    let mut best: &[Block] = incumbent;
    let mut winner = None;
    for (pos, candidate) in candidates.iter().enumerate() {
        if compare_chains(best, candidate) == ForkChoice::AdoptCandidate {
            best = candidate;
            winner = Some(pos);
        }
    }
    winner
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(stakes: &[u64]) -> Vec<Block> {
        let mut out = vec![Block::genesis()];
        for (i, s) in stakes.iter().enumerate() {
            let mut b = Block::genesis();
            b.index = i as u64 + 1;
            b.stake_value = *s;
            out.push(b);
        }
        out
    }

    #[test]
    fn longer_chain_beats_more_stake() {
        let incumbent = chain(&[10, 10]);
        let candidate = chain(&[0, 0, 0]);
        assert_eq!(compare_chains(&incumbent, &candidate), ForkChoice::AdoptCandidate);
        assert_eq!(compare_chains(&candidate, &incumbent), ForkChoice::KeepIncumbent);
    }

    #[test]
    fn stake_breaks_length_ties() {
        let incumbent = chain(&[1, 1]);
        let candidate = chain(&[1, 2]);
        assert_eq!(compare_chains(&incumbent, &candidate), ForkChoice::AdoptCandidate);
    }

    #[test]
    fn full_tie_keeps_incumbent() {
        let incumbent = chain(&[3, 1]);
        let candidate = chain(&[2, 2]);
        assert_eq!(compare_chains(&incumbent, &candidate), ForkChoice::KeepIncumbent);
    }

    #[test]
    fn select_chain_folds_to_heaviest() {
        let incumbent = chain(&[1]);
        let a = chain(&[1, 1]);
        let b = chain(&[1, 1, 1]);
        let c = chain(&[5, 5, 0]);
        assert_eq!(select_chain(&incumbent, &[&a, &b, &c]), Some(2));
        assert_eq!(select_chain(&b, &[&a]), None);
        assert_eq!(select_chain(&incumbent, &[]), None);
    }
}
