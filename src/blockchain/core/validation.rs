use crate::blockchain::core::chain::Block;
use crate::crypto::ZERO_ADDRESS;
use crate::error::ChainError;
use crate::miner::pow::hash_to_u256;
use primitive_types::U256;
use std::collections::HashMap;

pub fn validate_no_duplicate_transactions(block: &Block) -> Result<(), ChainError> {
    let mut seen = HashMap::new();
    for (i, tx) in block.transactions.iter().enumerate() {
        if let Some(first) = seen.insert(tx.hash, i) {
            return Err(ChainError::InvalidBlock(format!(
                "Transaction {} appears at positions {} and {}",
                tx.hash_str(),
                first,
                i
            )));
        }
    }
    Ok(())
}

impl Block {
    /// Checks a mined block: the stored header hash matches the header, meets
    /// `target`, and the header commits to the block's transactions, which
    /// start with the reward paid to the header's creator.
    pub fn verify_seal(&self, target: &U256) -> Result<(), ChainError> {
        let recomputed = self.header.hash();
        if recomputed != self.header_hash {
            return Err(ChainError::InvalidBlock(format!(
                "Header hash mismatch. Expected {}, but got {}.",
                hex::encode(recomputed),
                hex::encode(self.header_hash)
            )));
        }

        if hash_to_u256(&recomputed) > *target {
            return Err(ChainError::InvalidBlock(
                "Invalid Proof-of-Work: Block hash does not meet difficulty target.".to_string(),
            ));
        }

        let expected_root = Block::calculate_merkle_root(&self.transactions);
        if expected_root != self.header.transactions_root {
            return Err(ChainError::InvalidBlock(format!(
                "Merkle root mismatch. Expected {}, but got {}.",
                hex::encode(expected_root),
                hex::encode(self.header.transactions_root)
            )));
        }

        match self.transactions.first() {
            Some(reward)
                if reward.data.from == ZERO_ADDRESS
                    && reward.data.to == Some(self.header.creator) => {}
            _ => {
                return Err(ChainError::InvalidBlock(
                    "First transaction in a block must be the reward transaction.".to_string(),
                ))
            }
        }

        validate_no_duplicate_transactions(self)
    }
}
