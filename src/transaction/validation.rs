/// Validation logic for transactions separated from type definitions
use crate::blockchain::AccountStateView;
use crate::error::ValidationError;
use crate::transaction::types::{Transaction, MAX_PAYLOAD_SIZE};
use num_traits::Signed;

impl Transaction {
    /// Validates this transaction against the given account state.
    ///
    /// Checks run in a fixed order and the first failure is returned, so every
    /// node rejects an invalid transaction for the same reason.
    pub fn validate<S>(&self, state: &S) -> Result<(), ValidationError>
    where
        S: AccountStateView + ?Sized,
    {
        let data = &self.data;
        let amount = data.amount.as_ref().ok_or(ValidationError::AmountNil)?;

        if amount.is_negative() {
            return Err(ValidationError::AmountNegative);
        }

        if *amount > state.balance(&data.from) {
            return Err(ValidationError::BalanceInsufficient);
        }

        if data.account_nonce < state.nonce(&data.from) {
            return Err(ValidationError::NonceTooLow);
        }

        if data.payload.len() > MAX_PAYLOAD_SIZE {
            return Err(ValidationError::PayloadOversized);
        }

        let signature = self
            .signature
            .as_ref()
            .ok_or(ValidationError::SignatureMissing)?;

        let data_hash = data.hash();
        if data_hash != self.hash {
            return Err(ValidationError::HashMismatch);
        }

        signature
            .verify(&data.from, &data_hash)
            .map_err(|_| ValidationError::SignatureInvalid)
    }
}
