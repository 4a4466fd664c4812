//! Proof-of-work mining: task assembly, difficulty targets and the parallel
//! nonce search.

pub mod engine;
pub mod pow;
pub mod task;

pub use engine::{
    abort_signal, partition_nonces, start_round, AbortHandle, AbortSignal, MiningRound,
    NonceRange, RoundOutcome, WorkerExit,
};
pub use pow::{hash_to_u256, meets_target, DifficultyTarget, DivisorTarget, LeadingZeroTarget};
pub use task::{AssemblyContext, AssemblyReport, MiningResult, Task};

use crate::error::ChainError;
use std::sync::Arc;

/// Runs nonce searches with a fixed number of worker threads.
pub struct Miner<D: DifficultyTarget> {
    threads: usize,
    difficulty: D,
}

impl<D: DifficultyTarget> Miner<D> {
    /// `threads == 0` uses one worker per available CPU.
    pub fn new(threads: usize, difficulty: D) -> Self {
        let threads = if threads == 0 { num_cpus::get() } else { threads };
        Miner {
            threads: threads.max(1),
            difficulty,
        }
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    pub fn difficulty_target(&self) -> &D {
        &self.difficulty
    }

    /// Starts a round over freshly partitioned, randomly seeded nonce ranges.
    pub fn start(&self, task: Task) -> Result<MiningRound, ChainError> {
        let target = self.difficulty.target(task.header().difficulty);
        let ranges = partition_nonces(self.threads, &mut rand::thread_rng());
        start_round(Arc::new(task), target, &ranges)
    }

    /// Mines `task` until a block is found or every range is exhausted.
    pub fn mine(&self, task: Task) -> Result<RoundOutcome, ChainError> {
        let mut round = self.start(task)?;
        Ok(round.wait())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::BlockHeader;

    #[test]
    fn test_zero_threads_uses_cpus() {
        let miner = Miner::new(0, DivisorTarget);
        assert_eq!(miner.threads(), num_cpus::get().max(1));
    }

    #[test]
    fn test_mine_easy_block() {
        let miner = Miner::new(2, DivisorTarget);
        let task = Task::new(BlockHeader::template(1, [0u8; 32], 16));
        let target = miner.difficulty_target().target(16);

        match miner.mine(task).unwrap() {
            RoundOutcome::Found(result) => {
                assert!(meets_target(&result.block.header_hash, &target));
                assert_eq!(result.block.header.hash(), result.block.header_hash);
            }
            other => panic!("expected a found block, got {:?}", other),
        }
    }
}
