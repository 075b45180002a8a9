//! Stake-adjusted proof-of-work difficulty.
//!
//! Difficulty is the number of leading hex zeros a block hash must carry. It starts at
//! `base` and drops by one for every `stake_step` units of the miner's stake, never leaving
//! `[min, max]`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DifficultyCurve {
    pub base: u32,
    pub min: u32,
    pub max: u32,
    pub stake_step: u64,
}

impl Default for DifficultyCurve {
    fn default() -> Self {
        Self { base: 4, min: 1, max: 8, stake_step: 1 }
    }
}

impl DifficultyCurve {
    /// Leading zeros required of a block mined with `stake`. Non-increasing in stake.
    pub fn difficulty(&self, stake: u64) -> u32 {
        let step = self.stake_step.max(1);
        let reduction = u32::try_from(stake / step).unwrap_or(u32::MAX);
        let upper = self.max.max(self.min);
        self.base.saturating_sub(reduction).clamp(self.min, upper)
    }

    pub fn is_satisfied(&self, hash: &str, stake: u64) -> bool {
        meets_difficulty(hash, self.difficulty(stake))
    }
}

pub fn meets_difficulty(hash: &str, zeros: u32) -> bool {
    let zeros = zeros as usize;
    hash.len() >= zeros && hash.bytes().take(zeros).all(|b| b == b'0')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_falls_with_stake_and_stays_in_bounds() {
        let curve = DifficultyCurve::default();
        assert_eq!(curve.difficulty(0), 4);
        assert_eq!(curve.difficulty(1), 3);
        assert_eq!(curve.difficulty(3), 1);
        assert_eq!(curve.difficulty(1_000), 1);
        assert_eq!(curve.difficulty(u64::MAX), 1);

        let mut prev = curve.difficulty(0);
        for stake in 1..20 {
            let d = curve.difficulty(stake);
            assert!(d <= prev);
            prev = d;
        }
    }

    #[test]
    fn base_above_max_is_clamped() {
        let curve = DifficultyCurve { base: 12, min: 2, max: 6, stake_step: 10 };
        assert_eq!(curve.difficulty(0), 6);
        assert_eq!(curve.difficulty(95), 3);
    }

    #[test]
    fn leading_zero_check() {
        assert!(meets_difficulty("000af", 3));
        assert!(!meets_difficulty("00af0", 3));
        assert!(meets_difficulty("anything", 0));
        assert!(!meets_difficulty("00", 3));
    }
}
