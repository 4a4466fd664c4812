//! Pending transaction pool

use crate::blockchain::Sha256Hash;
use crate::error::ChainError;
use crate::transaction::Transaction;
use std::collections::{HashMap, VecDeque};

/// Default cap on pooled transactions.
pub const DEFAULT_MEMPOOL_CAPACITY: usize = 10_000;

/// Source of pending transactions consumed by task assembly.
pub trait PendingTransactionSource {
    /// Removes a transaction, returning it if it was pending.
    fn remove_transaction(&mut self, hash: &Sha256Hash) -> Option<Transaction>;
}

/// FIFO pool of transactions waiting to be mined.
///
/// Removal only touches the map. Entries in `order` whose sequence number no
/// longer matches the map are stale and skipped, then compacted away once
/// they outnumber the live ones.
#[derive(Debug, Clone)]
pub struct Mempool {
    transactions: HashMap<Sha256Hash, (u64, Transaction)>,
    order: VecDeque<(u64, Sha256Hash)>,
    next_seq: u64,
    capacity: usize,
}

impl Default for Mempool {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MEMPOOL_CAPACITY)
    }
}

impl Mempool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Mempool {
            transactions: HashMap::new(),
            order: VecDeque::new(),
            next_seq: 0,
            capacity,
        }
    }

    pub fn add_transaction(&mut self, tx: Transaction) -> Result<(), ChainError> {
        if self.transactions.contains_key(&tx.hash) {
            return Err(ChainError::DuplicateTransaction(tx.hash_str()));
        }
        if self.transactions.len() >= self.capacity {
            return Err(ChainError::MempoolFull);
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.push_back((seq, tx.hash));
        self.transactions.insert(tx.hash, (seq, tx));
        Ok(())
    }

    fn live(&self, seq: u64, hash: &Sha256Hash) -> Option<&Transaction> {
        match self.transactions.get(hash) {
            Some((live_seq, tx)) if *live_seq == seq => Some(tx),
            _ => None,
        }
    }

    fn compact(&mut self) {
        let transactions = &self.transactions;
        self.order.retain(|(seq, hash)| {
            matches!(transactions.get(hash), Some((live_seq, _)) if live_seq == seq)
        });
    }

    /// Up to `limit` transactions in arrival order, left in the pool.
    pub fn candidates(&self, limit: usize) -> Vec<Transaction> {
        self.order
            .iter()
            .filter_map(|(seq, hash)| self.live(*seq, hash))
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn contains(&self, hash: &Sha256Hash) -> bool {
        self.transactions.contains_key(hash)
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

impl PendingTransactionSource for Mempool {
    fn remove_transaction(&mut self, hash: &Sha256Hash) -> Option<Transaction> {
        let (_, removed) = self.transactions.remove(hash)?;
        if self.order.len() > 2 * self.transactions.len() + 64 {
            self.compact();
        }
        Some(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::address_from_string;
    use crate::transaction::Amount;

    fn transfer(nonce: u64) -> Transaction {
        Transaction::new_transfer(
            address_from_string("alice"),
            address_from_string("bob"),
            Amount::from(1u64),
            nonce,
        )
    }

    #[test]
    fn test_candidates_in_arrival_order() {
        let mut pool = Mempool::new();
        let txs: Vec<_> = (0..3).map(transfer).collect();
        for tx in &txs {
            pool.add_transaction(tx.clone()).unwrap();
        }

        assert_eq!(pool.candidates(10), txs);
        assert_eq!(pool.candidates(2), txs[..2].to_vec());
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn test_duplicate_and_capacity() {
        let mut pool = Mempool::with_capacity(1);
        let tx = transfer(0);
        pool.add_transaction(tx.clone()).unwrap();

        assert!(matches!(
            pool.add_transaction(tx),
            Err(ChainError::DuplicateTransaction(_))
        ));
        assert!(matches!(
            pool.add_transaction(transfer(1)),
            Err(ChainError::MempoolFull)
        ));
    }

    #[test]
    fn test_remove_transaction() {
        let mut pool = Mempool::new();
        let tx = transfer(0);
        pool.add_transaction(tx.clone()).unwrap();

        assert_eq!(pool.remove_transaction(&tx.hash), Some(tx.clone()));
        assert!(pool.remove_transaction(&tx.hash).is_none());
        assert!(pool.is_empty());
        assert!(pool.candidates(10).is_empty());
    }

    #[test]
    fn test_readded_transaction_queued_once_at_back() {
        let mut pool = Mempool::new();
        let txs: Vec<_> = (0..3).map(transfer).collect();
        for tx in &txs {
            pool.add_transaction(tx.clone()).unwrap();
        }

        pool.remove_transaction(&txs[0].hash).unwrap();
        pool.add_transaction(txs[0].clone()).unwrap();

        assert_eq!(
            pool.candidates(10),
            vec![txs[1].clone(), txs[2].clone(), txs[0].clone()]
        );
    }

    #[test]
    fn test_draining_large_pool_keeps_order_bounded() {
        let mut pool = Mempool::new();
        let txs: Vec<_> = (0..500).map(transfer).collect();
        for tx in &txs {
            pool.add_transaction(tx.clone()).unwrap();
        }

        for tx in &txs[..450] {
            assert!(pool.remove_transaction(&tx.hash).is_some());
        }

        assert_eq!(pool.len(), 50);
        assert!(pool.order.len() <= 2 * pool.len() + 64);
        assert_eq!(pool.candidates(100), txs[450..].to_vec());
    }
}
