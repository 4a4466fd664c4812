use crate::blockchain::core::state::AccountStateView;
use crate::crypto::Address;
use crate::error::ChainError;
use crate::merkle::merkle_root;
use crate::transaction::Transaction;
use sha2::{Digest, Sha256};

pub type Sha256Hash = [u8; 32];

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BlockHeader {
    pub height: u64,
    /// Unix time in milliseconds.
    pub timestamp: u64,
    pub previous_hash: Sha256Hash,
    pub creator: Address,
    pub state_root: Sha256Hash,
    pub transactions_root: Sha256Hash,
    pub difficulty: u64,
    pub nonce: u64,
}

impl BlockHeader {
    /// Header template for the block following `previous_hash`. Roots and nonce
    /// are filled in by task assembly and the nonce search.
    pub fn template(height: u64, previous_hash: Sha256Hash, difficulty: u64) -> Self {
        BlockHeader {
            height,
            timestamp: chrono::Utc::now().timestamp_millis().max(0) as u64,
            previous_hash,
            creator: [0u8; 32],
            state_root: [0u8; 32],
            transactions_root: [0u8; 32],
            difficulty,
            nonce: 0,
        }
    }

    pub fn hash(&self) -> Sha256Hash {
        let mut hasher = Sha256::new();
        hasher.update(self.height.to_le_bytes());
        hasher.update(self.timestamp.to_le_bytes());
        hasher.update(self.previous_hash);
        hasher.update(self.creator);
        hasher.update(self.state_root);
        hasher.update(self.transactions_root);
        hasher.update(self.difficulty.to_le_bytes());
        hasher.update(self.nonce.to_le_bytes());
        hasher.finalize().into()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Block {
    pub header_hash: Sha256Hash,
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Builds a block, committing `transactions` into the header's
    /// transactions root and hashing the resulting header.
    pub fn new(mut header: BlockHeader, transactions: Vec<Transaction>) -> Self {
        header.transactions_root = Block::calculate_merkle_root(&transactions);
        Block {
            header_hash: header.hash(),
            header,
            transactions,
        }
    }

    pub fn hash(&self) -> Sha256Hash {
        self.header.hash()
    }

    pub fn calculate_merkle_root(transactions: &[Transaction]) -> Sha256Hash {
        merkle_root(transactions)
    }
}

/// Applies one transaction's effects to account state and the block header.
pub trait ChainView {
    fn apply_transaction(
        &self,
        tx: &Transaction,
        coinbase: &Address,
        state: &mut dyn AccountStateView,
        header: &mut BlockHeader,
    ) -> Result<(), ChainError>;
}

/// Address credited by a contract creation transaction.
pub fn contract_address(creator: &Address, nonce: u64) -> Address {
    let mut hasher = Sha256::new();
    hasher.update(creator);
    hasher.update(nonce.to_le_bytes());
    hasher.finalize().into()
}

/// Plain value transfers: debit the sender, credit the receiver and advance
/// the sender's nonce. Contract creations credit the derived contract account.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransferChainView;

impl ChainView for TransferChainView {
    fn apply_transaction(
        &self,
        tx: &Transaction,
        _coinbase: &Address,
        state: &mut dyn AccountStateView,
        _header: &mut BlockHeader,
    ) -> Result<(), ChainError> {
        let data = &tx.data;
        let amount = data.amount.as_ref().ok_or_else(|| {
            ChainError::ApplyFailed(format!("transaction {} has no amount", tx.hash_str()))
        })?;

        let sender = state.get_or_create(&data.from);
        if sender.balance < *amount {
            return Err(ChainError::ApplyFailed(format!(
                "sender {} cannot cover {} with balance {}",
                hex::encode(data.from),
                amount,
                sender.balance
            )));
        }
        sender.sub_amount(amount);
        sender.nonce = data.account_nonce + 1;

        let receiver = data
            .to
            .unwrap_or_else(|| contract_address(&data.from, data.account_nonce));
        state.get_or_create(&receiver).add_amount(amount);

        Ok(())
    }
}
