//! Credit ledger over the identity store's accounts.
//!
//! The balance check and the debit happen under the account's own mutex,
//! so two concurrent charges against one user are serialized and a balance
//! can never go below zero.

use tracing::debug;

use unbound_contracts::{
    error::{GatewayError, GatewayResult},
    user::UserId,
};
use unbound_core::traits::CreditLedger;

use crate::store::{lock, InMemoryIdentityStore};

impl CreditLedger for InMemoryIdentityStore {
    fn charge(&self, user_id: UserId, amount: u64) -> GatewayResult<u64> {
        let account = self.account(user_id)?;
        let mut user = lock(&account)?;

        let balance = user.credits;
        if balance < amount {
            debug!(user_id = %user_id, balance, required = amount, "charge refused");
            return Err(GatewayError::InsufficientCredits { balance, required: amount });
        }

        user.credits = balance - amount;
        debug!(user_id = %user_id, amount, balance = user.credits, "charged");
        Ok(user.credits)
    }

    fn refund(&self, user_id: UserId, amount: u64) -> GatewayResult<u64> {
        let account = self.account(user_id)?;
        let mut user = lock(&account)?;

        user.credits = user.credits.saturating_add(amount);
        debug!(user_id = %user_id, amount, balance = user.credits, "refunded");
        Ok(user.credits)
    }
}
