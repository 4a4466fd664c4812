use crate::crypto::Address;
use crate::transaction::Amount;
use num_traits::Zero;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use super::chain::Sha256Hash;

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Account {
    pub balance: Amount,
    pub nonce: u64,
}

impl Account {
    pub fn add_amount(&mut self, amount: &Amount) {
        self.balance += amount;
    }

    pub fn sub_amount(&mut self, amount: &Amount) {
        self.balance -= amount;
    }
}

/// Mutable view of account balances and nonces, committed to a state root.
pub trait AccountStateView {
    fn balance(&self, address: &Address) -> Amount;
    fn nonce(&self, address: &Address) -> u64;
    fn get_or_create(&mut self, address: &Address) -> &mut Account;
    /// Commits pending changes and returns the resulting state root.
    fn commit(&mut self) -> Sha256Hash;
}

/// In-memory account state keyed in address order, so the state root is
/// independent of insertion order.
#[derive(Debug, Clone, Default)]
pub struct AccountState {
    accounts: BTreeMap<Address, Account>,
    root: Option<Sha256Hash>,
}

impl AccountState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, address: &Address) -> Option<&Account> {
        self.accounts.get(address)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Root of the last commit, if any.
    pub fn committed_root(&self) -> Option<Sha256Hash> {
        self.root
    }

    fn compute_root(&self) -> Sha256Hash {
        let mut hasher = Sha256::new();
        for (address, account) in &self.accounts {
            // Untouched default accounts do not change the root.
            if account.balance.is_zero() && account.nonce == 0 {
                continue;
            }
            let balance = account.balance.to_signed_bytes_be();
            hasher.update(address);
            hasher.update((balance.len() as u64).to_le_bytes());
            hasher.update(&balance);
            hasher.update(account.nonce.to_le_bytes());
        }
        hasher.finalize().into()
    }
}

impl AccountStateView for AccountState {
    fn balance(&self, address: &Address) -> Amount {
        self.accounts
            .get(address)
            .map(|account| account.balance.clone())
            .unwrap_or_default()
    }

    fn nonce(&self, address: &Address) -> u64 {
        self.accounts.get(address).map_or(0, |account| account.nonce)
    }

    fn get_or_create(&mut self, address: &Address) -> &mut Account {
        self.root = None;
        self.accounts.entry(*address).or_default()
    }

    fn commit(&mut self) -> Sha256Hash {
        let root = self.compute_root();
        self.root = Some(root);
        root
    }
}
