//! Component trait definitions for the Unbound gateway.
//!
//! These five traits define the storage and evaluation boundary:
//!
//! - `IdentityStore`    — owns user records, resolves credentials
//! - `RuleStore`        — owns the ordered rule set
//! - `CommandEvaluator` — pure first-match verdict over a rule snapshot
//! - `CreditLedger`     — the only mutator of balances
//! - `AuditLog`         — append-only system of record
//!
//! The `Gateway` wires them together and enforces authorization. None of
//! these traits check roles themselves.

use unbound_contracts::{
    command::{CommandEvent, HistoryScope},
    error::GatewayResult,
    rule::{NewRule, Rule, RuleId, RulePatch},
    user::{IssuedCredential, Role, User, UserId},
    verdict::Evaluation,
};

/// Holds user accounts and verifies presented credentials.
pub trait IdentityStore: Send + Sync {
    /// Resolve a plaintext credential to its user.
    ///
    /// Must compare in constant time and return `GatewayError::Auth` for
    /// unknown and malformed credentials alike.
    fn resolve(&self, credential: &str) -> GatewayResult<User>;

    /// Create a user with a fresh credential.
    ///
    /// The returned `IssuedCredential` carries the only plaintext copy.
    fn create(&self, name: &str, role: Role) -> GatewayResult<IssuedCredential>;

    fn get(&self, user_id: UserId) -> GatewayResult<User>;

    /// All users, oldest first. Never includes credential material.
    fn list(&self) -> GatewayResult<Vec<User>>;

    /// Overwrite a user's balance (admin credit adjustment).
    fn set_credits(&self, user_id: UserId, balance: u64) -> GatewayResult<User>;

    /// Remove `user_id`. Fails with `SelfDelete` when it equals `acting`.
    fn delete(&self, acting: UserId, user_id: UserId) -> GatewayResult<()>;
}

/// Holds the ordered collection of match rules.
///
/// Every mutation validates the pattern before committing; on error the
/// store is unchanged.
pub trait RuleStore: Send + Sync {
    fn create(&self, rule: NewRule) -> GatewayResult<Rule>;

    fn update(&self, rule_id: RuleId, patch: RulePatch) -> GatewayResult<Rule>;

    fn delete(&self, rule_id: RuleId) -> GatewayResult<()>;

    /// Every rule, active or not, in evaluation order.
    fn list_ordered(&self) -> GatewayResult<Vec<Rule>>;
}

/// Computes the verdict for a command against the active rules.
///
/// Implementations are trusted and must be deterministic: the same rule set
/// and command always produce the same `Evaluation`.
pub trait CommandEvaluator: Send + Sync {
    fn evaluate(&self, command: &str) -> GatewayResult<Evaluation>;
}

/// Atomic per-user balance mutation.
pub trait CreditLedger: Send + Sync {
    /// Debit `amount` and return the new balance.
    ///
    /// The check and the debit are one atomic step per user. When the
    /// balance is short, returns `InsufficientCredits` and changes nothing.
    fn charge(&self, user_id: UserId, amount: u64) -> GatewayResult<u64>;

    /// Return `amount` to the user after a charge whose request was aborted.
    fn refund(&self, user_id: UserId, amount: u64) -> GatewayResult<u64>;
}

/// The immutable record of every evaluated command.
pub trait AuditLog: Send + Sync {
    /// Append one event. The event is durable when this returns `Ok`.
    ///
    /// Records written here are never modified or deleted.
    fn record(&self, event: &CommandEvent) -> GatewayResult<()>;

    /// Events visible under `scope`, newest first, at most `limit` of them.
    fn query(&self, scope: HistoryScope, limit: Option<usize>) -> GatewayResult<Vec<CommandEvent>>;
}
