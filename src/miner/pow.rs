//! Difficulty targets and hash comparison.
//!
//! Header hashes are read as 256-bit big-endian unsigned integers; a header
//! is a valid proof of work when its hash is at most the target.

use crate::blockchain::Sha256Hash;
use primitive_types::U256;

/// Maps a difficulty to the largest acceptable header hash. Targets are
/// positive and never increase as difficulty grows.
pub trait DifficultyTarget {
    fn target(&self, difficulty: u64) -> U256;
}

/// `U256::MAX / difficulty`, with difficulty 0 treated as 1.
#[derive(Debug, Clone, Copy, Default)]
pub struct DivisorTarget;

impl DifficultyTarget for DivisorTarget {
    fn target(&self, difficulty: u64) -> U256 {
        U256::MAX / U256::from(difficulty.max(1))
    }
}

/// Difficulty counts required leading zero bits, capped at 255.
#[derive(Debug, Clone, Copy, Default)]
pub struct LeadingZeroTarget;

impl DifficultyTarget for LeadingZeroTarget {
    fn target(&self, difficulty: u64) -> U256 {
        U256::MAX >> (difficulty.min(255) as usize)
    }
}

#[inline]
pub fn hash_to_u256(hash: &Sha256Hash) -> U256 {
    U256::from_big_endian(hash)
}

#[inline]
pub fn meets_target(hash: &Sha256Hash, target: &U256) -> bool {
    hash_to_u256(hash) <= *target
}
