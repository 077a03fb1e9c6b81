//! First-match command evaluation.
//!
//! Evaluation algorithm:
//!
//! 1. Take the store's current snapshot (already in priority order).
//! 2. Skip inactive rules.
//! 3. The first rule whose pattern occurs in the command decides; later
//!    rules are never consulted.
//! 4. If none match, the evaluation carries no match and the gateway applies
//!    its no-match policy.
//!
//! The risk score is computed separately and attached in every case.

use std::sync::Arc;

use tracing::debug;

use unbound_contracts::{error::GatewayResult, verdict::Evaluation};
use unbound_core::traits::CommandEvaluator;

use crate::{risk, rule::CompiledRule, store::InMemoryRuleStore};

/// Return the first active rule in `rules` that matches `command`.
///
/// `rules` must already be in priority order.
pub fn first_match<'a>(command: &str, rules: &'a [CompiledRule]) -> Option<&'a CompiledRule> {
    rules.iter().find(|rule| rule.matches(command))
}

/// A `CommandEvaluator` over an `InMemoryRuleStore`.
///
/// ```rust,ignore
/// let store = Arc::new(InMemoryRuleStore::new());
/// let engine = RuleEngine::new(store.clone());
/// let evaluation = engine.evaluate("git pull origin main")?;
/// ```
pub struct RuleEngine {
    store: Arc<InMemoryRuleStore>,
}

impl RuleEngine {
    pub fn new(store: Arc<InMemoryRuleStore>) -> Self {
        Self { store }
    }
}

impl CommandEvaluator for RuleEngine {
    fn evaluate(&self, command: &str) -> GatewayResult<Evaluation> {
        let snapshot = self.store.snapshot()?;

        let matched = first_match(command, &snapshot).map(|rule| {
            debug!(
                rule_id = %rule.rule.id,
                order_key = rule.rule.order_key,
                action = ?rule.rule.action,
                "rule matched"
            );
            rule.to_match()
        });

        if matched.is_none() {
            debug!(rules = snapshot.len(), "no active rule matched");
        }

        Ok(Evaluation {
            matched,
            risk_score: risk::score(command),
        })
    }
}
