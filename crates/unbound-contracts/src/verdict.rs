//! Evaluation results and the per-request outcome returned to callers.

use serde::{Deserialize, Serialize};

use crate::{
    command::{CommandStatus, EventId, VerdictSource},
    rule::{RuleAction, RuleId},
};

/// The rule that decided a command, captured at evaluation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleMatch {
    pub rule_id: RuleId,
    pub pattern: String,
    pub action: RuleAction,
}

/// What the evaluator says about one command.
///
/// `matched` is the first active rule (in priority order) whose pattern is
/// found in the command, or `None`. `risk_score` is computed independently
/// of rule matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub matched: Option<RuleMatch>,
    pub risk_score: u32,
}

/// Terminal state of a submitted command.
///
/// `InsufficientCredits` has no audit counterpart: the command was never
/// attempted, so nothing is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    Executed,
    Blocked,
    NoMatch,
    InsufficientCredits,
}

impl From<CommandStatus> for ExecutionStatus {
    fn from(status: CommandStatus) -> Self {
        match status {
            CommandStatus::Executed => ExecutionStatus::Executed,
            CommandStatus::Blocked => ExecutionStatus::Blocked,
            CommandStatus::NoMatch => ExecutionStatus::NoMatch,
        }
    }
}

/// The answer to `POST /commands/execute`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub status: ExecutionStatus,
    /// Balance after this request. Present for `Executed` and
    /// `InsufficientCredits`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_credits: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_rule: Option<RuleMatch>,
    pub risk_score: u32,
    pub verdict_source: VerdictSource,
    /// The audit entry written for this request, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<EventId>,
}
