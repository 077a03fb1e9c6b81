//! Audit trail types.
//!
//! A `CommandEvent` is the permanent record of one evaluated command. It is
//! written exactly once and never modified. Users and rules are referenced by
//! id only; the pattern that matched is copied in at write time so later rule
//! edits or deletions cannot change what the record says.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{rule::RuleId, user::UserId};

/// Unique identifier for an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub uuid::Uuid);

impl EventId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The recorded outcome of an evaluated command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandStatus {
    Executed,
    Blocked,
    NoMatch,
}

/// Which part of the gateway produced the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictSource {
    /// An admin-defined rule matched.
    RuleEngine,
    /// No rule matched and the risk score crossed the configured threshold.
    RiskHeuristic,
    /// No rule matched; the configured no-match policy decided.
    DefaultPolicy,
}

impl fmt::Display for VerdictSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerdictSource::RuleEngine => f.write_str("rule_engine"),
            VerdictSource::RiskHeuristic => f.write_str("risk_heuristic"),
            VerdictSource::DefaultPolicy => f.write_str("default_policy"),
        }
    }
}

/// An immutable audit entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandEvent {
    pub id: EventId,
    pub user_id: UserId,
    /// The submitted text, verbatim.
    pub command_text: String,
    pub status: CommandStatus,
    pub matched_rule_id: Option<RuleId>,
    /// The matched rule's pattern as it read when the command was evaluated.
    pub matched_pattern: Option<String>,
    pub verdict_source: VerdictSource,
    pub risk_score: u32,
    /// Non-zero only when `status` is `Executed`.
    pub credits_used: u64,
    pub timestamp: DateTime<Utc>,
}

/// Which events a history query may return.
///
/// Resolved by the gateway from the caller's role; the audit log applies it
/// when reading, so a member-scoped query cannot see another user's events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryScope {
    /// Only events submitted by this user.
    User(UserId),
    /// Every user's events. Admin only.
    All,
}

impl HistoryScope {
    /// Return true if `event` is visible under this scope.
    pub fn includes(&self, event: &CommandEvent) -> bool {
        match self {
            HistoryScope::User(user_id) => event.user_id == *user_id,
            HistoryScope::All => true,
        }
    }
}
