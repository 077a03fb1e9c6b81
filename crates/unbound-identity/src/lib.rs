//! # unbound-identity
//!
//! User accounts, API credentials and credit balances for the Unbound
//! gateway.
//!
//! [`InMemoryIdentityStore`] implements both
//! [`IdentityStore`](unbound_core::traits::IdentityStore) and
//! [`CreditLedger`](unbound_core::traits::CreditLedger): balances live on the
//! account records, and the ledger is the only path that debits them.
//!
//! Credentials are issued once, in plaintext, by `create`. The store keeps
//! only a SHA-256 digest and resolves presented keys by comparing against
//! every account without early exit.

pub mod credential;
pub mod ledger;
pub mod store;

pub use store::InMemoryIdentityStore;

// ── Tests ─────────────────────────────────────────────────────────────────────
