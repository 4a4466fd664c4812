/// Economics module: block reward schedule
use crate::transaction::Amount;

/// Base units per coin.
pub const COIN: u64 = 100_000_000;
pub const INITIAL_REWARD: u64 = 50 * COIN;
pub const HALVING_INTERVAL: u64 = 210_000;

/// Amount minted to the coinbase of the block at a given height.
pub trait RewardPolicy {
    fn reward(&self, height: u64) -> Amount;
}

/// Reward that halves every `halving_interval` blocks and reaches zero after
/// 64 halvings.
#[derive(Debug, Clone, Copy)]
pub struct HalvingReward {
    pub initial_reward: u64,
    pub halving_interval: u64,
}

impl Default for HalvingReward {
    fn default() -> Self {
        HalvingReward {
            initial_reward: INITIAL_REWARD,
            halving_interval: HALVING_INTERVAL,
        }
    }
}

impl RewardPolicy for HalvingReward {
    fn reward(&self, height: u64) -> Amount {
        let halvings = height / self.halving_interval.max(1);
        if halvings >= 64 {
            return Amount::from(0u64);
        }
        Amount::from(self.initial_reward >> halvings)
    }
}

/// The same reward at every height.
#[derive(Debug, Clone)]
pub struct FixedReward(pub Amount);

impl RewardPolicy for FixedReward {
    fn reward(&self, _height: u64) -> Amount {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_halving_schedule() {
        let policy = HalvingReward::default();
        assert_eq!(policy.reward(0), Amount::from(INITIAL_REWARD));
        assert_eq!(policy.reward(HALVING_INTERVAL - 1), Amount::from(INITIAL_REWARD));
        assert_eq!(policy.reward(HALVING_INTERVAL), Amount::from(INITIAL_REWARD / 2));
        assert_eq!(policy.reward(HALVING_INTERVAL * 3), Amount::from(INITIAL_REWARD / 8));
        assert_eq!(policy.reward(HALVING_INTERVAL * 64), Amount::from(0u64));
    }

    #[test]
    fn test_fixed_reward() {
        let policy = FixedReward(Amount::from(7u64));
        assert_eq!(policy.reward(0), policy.reward(1_000_000));
    }
}
