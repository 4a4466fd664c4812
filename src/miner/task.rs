//! Mining task assembly.

use crate::blockchain::{AccountStateView, Block, BlockHeader, ChainView, Sha256Hash};
use crate::crypto::Address;
use crate::economics::RewardPolicy;
use crate::error::ChainError;
use crate::mempool::PendingTransactionSource;
use crate::transaction::{Amount, Transaction};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Collaborators consulted while assembling a task.
pub struct AssemblyContext<'a> {
    pub coinbase: Address,
    pub pending: &'a mut dyn PendingTransactionSource,
    pub chain: &'a dyn ChainView,
    pub reward: &'a dyn RewardPolicy,
}

/// What happened to the candidates of one assembly round.
#[derive(Debug, Clone)]
pub struct AssemblyReport {
    pub reward: Amount,
    pub applied: Vec<Sha256Hash>,
    pub dropped: Vec<(Sha256Hash, ChainError)>,
    pub state_root: Sha256Hash,
}

/// A block draft for one mining round.
#[derive(Debug, Clone)]
pub struct Task {
    header: BlockHeader,
    transactions: Vec<Transaction>,
    created_at: Instant,
}

impl Task {
    pub fn new(header: BlockHeader) -> Self {
        Task {
            header,
            transactions: Vec::new(),
            created_at: Instant::now(),
        }
    }

    /// Assembles a fresh task from `header` in one call.
    pub fn assemble(
        header: BlockHeader,
        ctx: &mut AssemblyContext<'_>,
        state: &mut dyn AccountStateView,
        candidates: Vec<Transaction>,
    ) -> (Self, AssemblyReport) {
        let mut task = Task::new(header);
        let report = task.apply_transactions(ctx, state, candidates);
        (task, report)
    }

    /// Mints the reward, applies every valid candidate and commits the state.
    ///
    /// Each candidate is removed from the pending source before it is
    /// validated. Candidates that fail validation or cannot be applied are
    /// dropped for good; they are not returned to the pending source.
    fn apply_transactions(
        &mut self,
        ctx: &mut AssemblyContext<'_>,
        state: &mut dyn AccountStateView,
        candidates: Vec<Transaction>,
    ) -> AssemblyReport {
        let height = self.header.height;
        self.header.creator = ctx.coinbase;

        // The reward is always the first transaction of the block.
        let reward_value = ctx.reward.reward(height);
        let reward = Transaction::new_reward(ctx.coinbase, reward_value.clone());
        state.get_or_create(&ctx.coinbase).add_amount(&reward_value);
        self.transactions.push(reward);

        let mut applied = Vec::new();
        let mut dropped = Vec::new();

        for tx in candidates {
            ctx.pending.remove_transaction(&tx.hash);

            if let Err(kind) = tx.validate(&*state) {
                warn!("validating tx {} failed: {}", tx.hash_str(), kind);
                dropped.push((tx.hash, kind.into()));
                continue;
            }

            if let Err(e) = ctx
                .chain
                .apply_transaction(&tx, &ctx.coinbase, state, &mut self.header)
            {
                warn!("applying tx {} failed: {}", tx.hash_str(), e);
                dropped.push((tx.hash, e));
                continue;
            }

            applied.push(tx.hash);
            self.transactions.push(tx);
        }

        info!(
            "mining block height:{}, reward:{}, transaction number:{}",
            height,
            reward_value,
            self.transactions.len()
        );

        let state_root = state.commit();
        self.header.state_root = state_root;

        AssemblyReport {
            reward: reward_value,
            applied,
            dropped,
            state_root,
        }
    }

    /// Builds the block for this task, committing its transactions root.
    pub fn generate_block(&self) -> Block {
        Block::new(self.header.clone(), self.transactions.clone())
    }

    pub fn header(&self) -> &BlockHeader {
        &self.header
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }
}

/// A mined block together with the task it was built from.
#[derive(Debug, Clone)]
pub struct MiningResult {
    pub task: Arc<Task>,
    pub block: Block,
}
