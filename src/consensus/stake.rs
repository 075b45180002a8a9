//! Stake registry kept by the tracker, and the policy that moves stake around.
//!
//! Stake only ever changes through a `StakePolicy` reacting to chain events; the
//! registry itself just stores the numbers.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StakeEvent {
    /// a block mined by the peer entered the reference chain
    BlockAdopted,
    /// the peer mined the first invalid block of a reported chain
    BlockRejected,
}

pub trait StakePolicy: Send + Sync + 'static {
    fn adjust(&self, current: u64, event: StakeEvent) -> u64;
}

/// Fixed reward per adopted block and fixed penalty per rejected one, floored at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearStakePolicy {
    pub reward: u64,
    pub penalty: u64,
}

impl Default for LinearStakePolicy {
    fn default() -> Self {
        Self { reward: 1, penalty: 1 }
    }
}

impl StakePolicy for LinearStakePolicy {
    fn adjust(&self, current: u64, event: StakeEvent) -> u64 {
        match event {
            StakeEvent::BlockAdopted => current.saturating_add(self.reward),
            StakeEvent::BlockRejected => current.saturating_sub(self.penalty),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StakeLedger {
    stakes: BTreeMap<String, u64>,
    initial: u64,
}

impl StakeLedger {
    pub fn new(initial: u64) -> Self {
        Self { stakes: BTreeMap::new(), initial }
    }

    /// Stake for `peer`, assigning the initial stake on first sight.
    pub fn assign(&mut self, peer: &str) -> u64 {
        *self.stakes.entry(peer.to_string()).or_insert(self.initial)
    }

    pub fn get(&self, peer: &str) -> Option<u64> {
        self.stakes.get(peer).copied()
    }

    /// Apply `event` to a known peer. Unknown peers are left alone and yield `None`.
    pub fn apply(&mut self, peer: &str, event: StakeEvent, policy: &dyn StakePolicy) -> Option<u64> {
        let stake = self.stakes.get_mut(peer)?;
        *stake = policy.adjust(*stake, event);
        Some(*stake)
    }

    pub fn total_stake(&self) -> u64 {
        self.stakes.values().fold(0u64, |acc, s| acc.saturating_add(*s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assign_is_sticky() {
        let mut stakes = StakeLedger::new(2);
        assert_eq!(stakes.assign("a"), 2);
        stakes.apply("a", StakeEvent::BlockAdopted, &LinearStakePolicy::default());
        assert_eq!(stakes.assign("a"), 3);
        assert_eq!(stakes.total_stake(), 3);
    }

    #[test]
    fn penalty_floors_at_zero_and_unknown_peers_are_ignored() {
        let policy = LinearStakePolicy { reward: 1, penalty: 5 };
        let mut stakes = StakeLedger::new(1);
        stakes.assign("a");
        assert_eq!(stakes.apply("a", StakeEvent::BlockRejected, &policy), Some(0));
        assert_eq!(stakes.apply("ghost", StakeEvent::BlockAdopted, &policy), None);
        assert_eq!(stakes.get("ghost"), None);
    }
}
