//! Match rule types.
//!
//! Rules map a regular expression over the raw command text to an action.
//! Evaluation order is the total order defined by [`Rule::priority_cmp`].

use std::{cmp::Ordering, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque, unique identifier for a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(pub uuid::Uuid);

impl RuleId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for RuleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// What happens to a command when a rule matches it.
///
/// Serialized in SCREAMING_SNAKE_CASE (`"AUTO_ACCEPT"`, `"AUTO_REJECT"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleAction {
    AutoAccept,
    AutoReject,
}

/// A stored match rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub id: RuleId,
    /// Regular expression searched (unanchored) within the command text.
    /// Always compiles: the store rejects invalid patterns before commit.
    pub pattern: String,
    pub action: RuleAction,
    pub description: Option<String>,
    /// Inactive rules stay in the ordered list but never match.
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    /// Evaluation rank, ascending. Defaults to creation order.
    pub order_key: i64,
}

impl Rule {
    /// Total evaluation order: `order_key`, then `created_at`, then `id`.
    pub fn priority_cmp(&self, other: &Rule) -> Ordering {
        self.order_key
            .cmp(&other.order_key)
            .then_with(|| self.created_at.cmp(&other.created_at))
            .then_with(|| self.id.cmp(&other.id))
    }
}

fn default_active() -> bool {
    true
}

/// Fields supplied when creating a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRule {
    pub pattern: String,
    pub action: RuleAction,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Explicit rank. When absent the rule is appended after every existing rule.
    #[serde(default)]
    pub order_key: Option<i64>,
}

impl NewRule {
    pub fn new(pattern: impl Into<String>, action: RuleAction) -> Self {
        Self {
            pattern: pattern.into(),
            action,
            description: None,
            is_active: true,
            order_key: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_order_key(mut self, order_key: i64) -> Self {
        self.order_key = Some(order_key);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}

/// A partial update. `None` leaves the field untouched.
///
/// An empty `description` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulePatch {
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub action: Option<RuleAction>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub order_key: Option<i64>,
}
