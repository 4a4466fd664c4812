/// Transaction types for ForgeChain
use crate::blockchain::Sha256Hash;
use crate::crypto::{Address, KeyPair, Signature, ZERO_ADDRESS};
use crate::error::{ChainError, ValidationError};
use crate::merkle::MerkleContent;
use num_bigint::BigInt;
use num_traits::Signed;
use sha2::{Digest, Sha256};

/// Maximum payload size in bytes (32 KiB) to prevent malicious transactions.
pub const MAX_PAYLOAD_SIZE: usize = 32 * 1024;

/// Arbitrary-precision amount of value. Negative values only ever arrive from
/// decoded input and are rejected by validation.
pub type Amount = BigInt;

/// The signed content of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TransactionData {
    pub from: Address,
    /// Receiver; `None` for a contract creation transaction.
    pub to: Option<Address>,
    /// Absent only when decoded from input that omitted it.
    #[serde(default)]
    pub amount: Option<Amount>,
    pub account_nonce: u64,
    /// Unix time in nanoseconds when the transaction was created.
    pub timestamp: u64,
    #[serde(default)]
    pub payload: Vec<u8>,
}

impl TransactionData {
    /// SHA-256 over the canonical encoding of every field.
    pub fn hash(&self) -> Sha256Hash {
        let mut hasher = Sha256::new();
        hasher.update(self.from);
        match &self.to {
            Some(to) => {
                hasher.update([1u8]);
                hasher.update(to);
            }
            None => hasher.update([0u8]),
        }
        match &self.amount {
            Some(amount) => {
                let bytes = amount.to_signed_bytes_be();
                hasher.update([1u8]);
                hasher.update((bytes.len() as u64).to_le_bytes());
                hasher.update(&bytes);
            }
            None => hasher.update([0u8]),
        }
        hasher.update(self.account_nonce.to_le_bytes());
        hasher.update(self.timestamp.to_le_bytes());
        hasher.update((self.payload.len() as u64).to_le_bytes());
        hasher.update(&self.payload);
        hasher.finalize().into()
    }
}

/// A transaction in a block.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Transaction {
    pub hash: Sha256Hash,
    pub data: TransactionData,
    pub signature: Option<Signature>,
}

impl Transaction {
    /// Creates a transfer of `amount` from `from` to `to`.
    ///
    /// # Panics
    /// Panics if `amount` is negative.
    pub fn new_transfer(from: Address, to: Address, amount: Amount, nonce: u64) -> Self {
        Self::build(from, Some(to), amount, nonce, Vec::new())
    }

    /// Creates a contract creation transaction carrying `code` as its payload.
    ///
    /// # Panics
    /// Panics if `amount` is negative.
    pub fn new_contract_creation(
        from: Address,
        amount: Amount,
        nonce: u64,
        code: &[u8],
    ) -> Result<Self, ChainError> {
        Self::new_with_payload(from, None, amount, nonce, code)
    }

    /// Creates a transfer that carries an arbitrary message payload.
    ///
    /// # Panics
    /// Panics if `amount` is negative.
    pub fn new_message(
        from: Address,
        to: Address,
        amount: Amount,
        nonce: u64,
        message: &[u8],
    ) -> Result<Self, ChainError> {
        Self::new_with_payload(from, Some(to), amount, nonce, message)
    }

    /// Protocol-issued block reward. It carries a placeholder signature and is
    /// never passed through `validate`.
    pub fn new_reward(coinbase: Address, amount: Amount) -> Self {
        let mut tx = Self::build(ZERO_ADDRESS, Some(coinbase), amount, 0, Vec::new());
        tx.signature = Some(Signature::placeholder());
        tx
    }

    fn new_with_payload(
        from: Address,
        to: Option<Address>,
        amount: Amount,
        nonce: u64,
        payload: &[u8],
    ) -> Result<Self, ChainError> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(ValidationError::PayloadOversized.into());
        }
        Ok(Self::build(from, to, amount, nonce, payload.to_vec()))
    }

    fn build(
        from: Address,
        to: Option<Address>,
        amount: Amount,
        nonce: u64,
        payload: Vec<u8>,
    ) -> Self {
        assert!(
            !amount.is_negative(),
            "Failed to create tx, amount is negative."
        );

        let data = TransactionData {
            from,
            to,
            amount: Some(amount),
            account_nonce: nonce,
            timestamp: now_nanos(),
            payload,
        };

        Transaction {
            hash: data.hash(),
            data,
            signature: None,
        }
    }

    /// Refreshes the hash from the current data, then signs it.
    pub fn sign(&mut self, keypair: &KeyPair) {
        self.hash = self.data.hash();
        self.signature = Some(keypair.sign_digest(&self.hash));
    }

    pub fn hash_str(&self) -> String {
        hex::encode(self.hash)
    }

    pub fn is_contract_creation(&self) -> bool {
        self.data.to.is_none()
    }
}

impl MerkleContent for Transaction {
    fn content_hash(&self) -> Sha256Hash {
        self.data.hash()
    }

    fn content_equals(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

fn now_nanos() -> u64 {
    chrono::Utc::now()
        .timestamp_nanos_opt()
        .map_or(0, |nanos| nanos.max(0) as u64)
}
