//! In-memory rule store with atomic snapshot publication.
//!
//! The store keeps the rule set as an immutable, already-sorted
//! `Arc<[CompiledRule]>`. Every mutation builds a complete replacement under
//! the write lock and swaps it in; readers clone the `Arc` under the read
//! lock and then evaluate with no lock held. An in-flight evaluation
//! therefore sees either the old set or the new one, never a mix.

use std::sync::{Arc, RwLock};

use chrono::Utc;
use tracing::{debug, info};

use unbound_contracts::{
    error::{GatewayError, GatewayResult},
    rule::{NewRule, Rule, RuleId, RulePatch},
};
use unbound_core::traits::RuleStore;

use crate::rule::{compile_pattern, CompiledRule, RuleSeeds};

// ── Internal mutable state ────────────────────────────────────────────────────

pub(crate) struct RuleTable {
    /// All rules in evaluation order.
    pub(crate) snapshot: Arc<[CompiledRule]>,

    /// The `order_key` given to the next rule created without one.
    /// Only ever grows, so default ranks follow creation order.
    pub(crate) next_order_key: i64,
}

impl RuleTable {
    fn publish(&mut self, mut rules: Vec<CompiledRule>) {
        rules.sort_by(|a, b| a.rule.priority_cmp(&b.rule));
        self.snapshot = rules.into();
    }

    fn reserve_order_key(&mut self, explicit: Option<i64>) -> i64 {
        match explicit {
            Some(key) => {
                self.next_order_key = self.next_order_key.max(key.saturating_add(1));
                key
            }
            None => {
                let key = self.next_order_key;
                self.next_order_key = key.saturating_add(1);
                key
            }
        }
    }
}

// ── Public store ──────────────────────────────────────────────────────────────

/// The reference `RuleStore`.
pub struct InMemoryRuleStore {
    pub(crate) state: RwLock<RuleTable>,
}

impl Default for InMemoryRuleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRuleStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(RuleTable {
                snapshot: Arc::from(Vec::new()),
                next_order_key: 1,
            }),
        }
    }

    /// Build a store pre-populated from TOML seed rules.
    pub fn from_toml_str(s: &str) -> GatewayResult<Self> {
        let store = Self::new();
        store.seed(RuleSeeds::from_toml_str(s)?.rules)?;
        Ok(store)
    }

    /// Create each rule in order. Stops at the first invalid one.
    pub fn seed(&self, rules: Vec<NewRule>) -> GatewayResult<()> {
        let count = rules.len();
        for rule in rules {
            self.create(rule)?;
        }
        info!(count, "rule store seeded");
        Ok(())
    }

    /// The current published rule set, in evaluation order.
    ///
    /// Holding the returned `Arc` does not block writers.
    pub fn snapshot(&self) -> GatewayResult<Arc<[CompiledRule]>> {
        let state = self.state.read().map_err(|e| GatewayError::poisoned("rule store", e))?;
        Ok(Arc::clone(&state.snapshot))
    }
}

// ── RuleStore impl ────────────────────────────────────────────────────────────

impl RuleStore for InMemoryRuleStore {
    fn create(&self, new_rule: NewRule) -> GatewayResult<Rule> {
        // Compile before taking the lock; a bad pattern never touches state.
        let regex = compile_pattern(&new_rule.pattern)?;

        let mut state = self.state.write().map_err(|e| GatewayError::poisoned("rule store", e))?;
        let order_key = state.reserve_order_key(new_rule.order_key);

        let rule = Rule {
            id: RuleId::new(),
            pattern: new_rule.pattern,
            action: new_rule.action,
            description: new_rule.description.filter(|d| !d.trim().is_empty()),
            is_active: new_rule.is_active,
            created_at: Utc::now(),
            order_key,
        };

        let mut rules = state.snapshot.to_vec();
        rules.push(CompiledRule::new(rule.clone(), regex));
        state.publish(rules);

        debug!(rule_id = %rule.id, order_key, "rule committed");
        Ok(rule)
    }

    fn update(&self, rule_id: RuleId, patch: RulePatch) -> GatewayResult<Rule> {
        let new_regex = match &patch.pattern {
            Some(pattern) => Some(compile_pattern(pattern)?),
            None => None,
        };

        let mut state = self.state.write().map_err(|e| GatewayError::poisoned("rule store", e))?;
        let mut rules = state.snapshot.to_vec();
        let position = rules
            .iter()
            .position(|r| r.rule.id == rule_id)
            .ok_or_else(|| GatewayError::rule_not_found(rule_id))?;

        let current = &rules[position];
        let mut rule = current.rule.clone();
        let regex = new_regex.unwrap_or_else(|| current.regex().clone());

        if let Some(pattern) = patch.pattern {
            rule.pattern = pattern;
        }
        if let Some(action) = patch.action {
            rule.action = action;
        }
        if let Some(description) = patch.description {
            rule.description = Some(description).filter(|d| !d.trim().is_empty());
        }
        if let Some(is_active) = patch.is_active {
            rule.is_active = is_active;
        }
        if let Some(order_key) = patch.order_key {
            rule.order_key = state.reserve_order_key(Some(order_key));
        }

        rules[position] = CompiledRule::new(rule.clone(), regex);
        state.publish(rules);

        debug!(rule_id = %rule.id, order_key = rule.order_key, "rule update committed");
        Ok(rule)
    }

    fn delete(&self, rule_id: RuleId) -> GatewayResult<()> {
        let mut state = self.state.write().map_err(|e| GatewayError::poisoned("rule store", e))?;
        let mut rules = state.snapshot.to_vec();
        let before = rules.len();
        rules.retain(|r| r.rule.id != rule_id);
        if rules.len() == before {
            return Err(GatewayError::rule_not_found(rule_id));
        }
        state.publish(rules);
        Ok(())
    }

    fn list_ordered(&self) -> GatewayResult<Vec<Rule>> {
        Ok(self.snapshot()?.iter().map(|r| r.rule.clone()).collect())
    }
}
