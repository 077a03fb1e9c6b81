//! # unbound-policy
//!
//! The ordered rule store and first-match evaluator for the Unbound gateway.
//!
//! ## Overview
//!
//! [`InMemoryRuleStore`] implements the
//! [`RuleStore`](unbound_core::traits::RuleStore) trait and publishes an
//! immutable snapshot after every committed mutation. [`RuleEngine`]
//! implements [`CommandEvaluator`](unbound_core::traits::CommandEvaluator)
//! over that snapshot and attaches the [`risk`] score.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use unbound_policy::{InMemoryRuleStore, RuleEngine};
//!
//! let store = Arc::new(InMemoryRuleStore::from_toml_str(include_str!("rules.toml"))?);
//! let engine = RuleEngine::new(store.clone());
//! ```
//!
//! ## Rule matching
//!
//! Patterns are regular expressions searched anywhere in the command text;
//! anchor with `^`/`$` for whole-command rules. Rules are applied in
//! ascending `order_key`; the first active match wins.

pub mod engine;
pub mod risk;
pub mod rule;
pub mod store;

pub use engine::{first_match, RuleEngine};
pub use rule::{compile_pattern, CompiledRule, RuleSeeds};
pub use store::InMemoryRuleStore;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use unbound_contracts::{
        error::GatewayError,
        rule::{NewRule, RuleAction, RulePatch},
    };
    use unbound_core::traits::{CommandEvaluator, RuleStore};

    use crate::{InMemoryRuleStore, RuleEngine};

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn engine_with(rules: Vec<NewRule>) -> (Arc<InMemoryRuleStore>, RuleEngine) {
        let store = Arc::new(InMemoryRuleStore::new());
        store.seed(rules).unwrap();
        let engine = RuleEngine::new(store.clone());
        (store, engine)
    }

    fn accept(pattern: &str) -> NewRule {
        NewRule::new(pattern, RuleAction::AutoAccept)
    }

    fn reject(pattern: &str) -> NewRule {
        NewRule::new(pattern, RuleAction::AutoReject)
    }

    // ── 1. no rules ───────────────────────────────────────────────────────────

    #[test]
    fn test_empty_rule_set_matches_nothing() {
        let (_, engine) = engine_with(vec![]);
        let evaluation = engine.evaluate("echo hello").unwrap();
        assert_eq!(evaluation.matched, None);
        assert_eq!(evaluation.risk_score, 0);
    }

    // ── 2. unanchored search ──────────────────────────────────────────────────

    /// Patterns are searched, not matched against the whole string.
    #[test]
    fn test_pattern_is_searched_anywhere() {
        let (_, engine) = engine_with(vec![reject("rm -rf")]);

        let evaluation = engine.evaluate("cd /tmp && rm -rf build").unwrap();
        assert_eq!(evaluation.matched.unwrap().action, RuleAction::AutoReject);
    }

    #[test]
    fn test_anchored_pattern_respects_anchor() {
        let (_, engine) = engine_with(vec![accept("^git (pull|fetch|status)")]);

        assert!(engine.evaluate("git pull origin main").unwrap().matched.is_some());
        assert!(engine.evaluate("echo git pull").unwrap().matched.is_none());
    }

    // ── 3. first-match wins ───────────────────────────────────────────────────

    /// When r1 and r3 both match, r1 decides and r3 is never consulted.
    #[test]
    fn test_first_match_wins() {
        let (store, engine) = engine_with(vec![
            reject("rm -rf").with_description("r1"),
            accept("^ls"),
            accept("rm").with_description("r3"),
        ]);

        let rules = store.list_ordered().unwrap();
        let evaluation = engine.evaluate("rm -rf /").unwrap();
        let matched = evaluation.matched.unwrap();

        assert_eq!(matched.rule_id, rules[0].id);
        assert_eq!(matched.action, RuleAction::AutoReject);
        assert!(evaluation.risk_score >= 100);
    }

    // ── 4. inactive rules ─────────────────────────────────────────────────────

    #[test]
    fn test_inactive_rules_are_skipped_but_listed() {
        let (store, engine) = engine_with(vec![reject("^git").inactive(), accept("^git status")]);

        let matched = engine.evaluate("git status").unwrap().matched.unwrap();
        assert_eq!(matched.action, RuleAction::AutoAccept);

        let listed = store.list_ordered().unwrap();
        assert_eq!(listed.len(), 2);
        assert!(!listed[0].is_active);
    }

    // ── 5. ordering ───────────────────────────────────────────────────────────

    #[test]
    fn test_default_order_follows_creation() {
        let (store, _) = engine_with(vec![accept("a"), accept("b"), accept("c")]);
        let keys: Vec<i64> = store.list_ordered().unwrap().iter().map(|r| r.order_key).collect();
        assert_eq!(keys, vec![1, 2, 3]);
    }

    #[test]
    fn test_reordering_changes_the_winner() {
        let (store, engine) = engine_with(vec![accept("^git"), reject("^git push")]);
        let rules = store.list_ordered().unwrap();
        assert_eq!(
            engine.evaluate("git push").unwrap().matched.unwrap().action,
            RuleAction::AutoAccept
        );

        store
            .update(rules[1].id, RulePatch { order_key: Some(0), ..RulePatch::default() })
            .unwrap();

        assert_eq!(
            engine.evaluate("git push").unwrap().matched.unwrap().action,
            RuleAction::AutoReject
        );
        // A rule created afterwards still lands at the end.
        let appended = store.create(accept("^ls")).unwrap();
        assert_eq!(store.list_ordered().unwrap().last().unwrap().id, appended.id);
    }

    #[test]
    fn test_explicit_order_key_advances_default_sequence() {
        let store = InMemoryRuleStore::new();
        store.create(accept("a").with_order_key(50)).unwrap();
        let next = store.create(accept("b")).unwrap();
        assert_eq!(next.order_key, 51);
    }

    #[test]
    fn test_equal_order_keys_fall_back_to_creation_time() {
        let store = InMemoryRuleStore::new();
        let first = store.create(accept("a").with_order_key(7)).unwrap();
        let second = store.create(accept("b").with_order_key(7)).unwrap();
        let listed = store.list_ordered().unwrap();
        let expected = if first.priority_cmp(&second).is_lt() {
            vec![first.id, second.id]
        } else {
            vec![second.id, first.id]
        };
        assert_eq!(listed.iter().map(|r| r.id).collect::<Vec<_>>(), expected);
    }

    // ── 6. pattern validation ─────────────────────────────────────────────────

    #[test]
    fn test_invalid_pattern_rejected_on_create() {
        let store = InMemoryRuleStore::new();
        match store.create(accept("git (pull")) {
            Err(GatewayError::InvalidPattern { pattern, .. }) => assert_eq!(pattern, "git (pull"),
            other => panic!("expected InvalidPattern, got {:?}", other),
        }
        assert!(store.list_ordered().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_pattern_on_update_leaves_rule_unchanged() {
        let store = InMemoryRuleStore::new();
        let rule = store.create(accept("^ls")).unwrap();

        let result = store.update(
            rule.id,
            RulePatch {
                pattern: Some("[unclosed".to_string()),
                is_active: Some(false),
                ..RulePatch::default()
            },
        );

        assert!(matches!(result, Err(GatewayError::InvalidPattern { .. })));
        let listed = store.list_ordered().unwrap();
        assert_eq!(listed, vec![rule]);
    }

    #[test]
    fn test_empty_pattern_rejected() {
        let store = InMemoryRuleStore::new();
        assert!(matches!(store.create(accept("  ")), Err(GatewayError::InvalidPattern { .. })));
    }

    // ── 7. update & delete ────────────────────────────────────────────────────

    #[test]
    fn test_update_applies_only_given_fields() {
        let store = InMemoryRuleStore::new();
        let rule = store.create(accept("^ls").with_description("listing")).unwrap();

        let updated = store
            .update(
                rule.id,
                RulePatch {
                    pattern: Some("^ls( |$)".to_string()),
                    action: Some(RuleAction::AutoReject),
                    ..RulePatch::default()
                },
            )
            .unwrap();

        assert_eq!(updated.id, rule.id);
        assert_eq!(updated.pattern, "^ls( |$)");
        assert_eq!(updated.action, RuleAction::AutoReject);
        assert_eq!(updated.description.as_deref(), Some("listing"));
        assert_eq!(updated.order_key, rule.order_key);
        assert_eq!(updated.created_at, rule.created_at);

        let cleared = store
            .update(rule.id, RulePatch { description: Some(String::new()), ..RulePatch::default() })
            .unwrap();
        assert_eq!(cleared.description, None);
    }

    #[test]
    fn test_updated_pattern_is_used_for_matching() {
        let (store, engine) = engine_with(vec![accept("^ls")]);
        let id = store.list_ordered().unwrap()[0].id;

        store
            .update(id, RulePatch { pattern: Some("^pwd".to_string()), ..RulePatch::default() })
            .unwrap();

        assert!(engine.evaluate("ls").unwrap().matched.is_none());
        assert!(engine.evaluate("pwd").unwrap().matched.is_some());
    }

    #[test]
    fn test_unknown_ids_are_not_found() {
        let store = InMemoryRuleStore::new();
        let id = unbound_contracts::rule::RuleId::new();
        assert!(matches!(store.delete(id), Err(GatewayError::NotFound { kind: "rule", .. })));
        assert!(matches!(
            store.update(id, RulePatch::default()),
            Err(GatewayError::NotFound { kind: "rule", .. })
        ));
    }

    #[test]
    fn test_delete_removes_rule_from_evaluation() {
        let (store, engine) = engine_with(vec![reject("rm -rf")]);
        let id = store.list_ordered().unwrap()[0].id;

        store.delete(id).unwrap();

        assert!(engine.evaluate("rm -rf /").unwrap().matched.is_none());
        assert!(store.list_ordered().unwrap().is_empty());
    }

    // ── 8. determinism & snapshots ────────────────────────────────────────────

    #[test]
    fn test_evaluation_is_deterministic() {
        let (_, engine) = engine_with(vec![accept("^git"), reject("push"), accept(".*")]);
        let first = engine.evaluate("git push --force").unwrap();
        for _ in 0..50 {
            assert_eq!(engine.evaluate("git push --force").unwrap(), first);
        }
    }

    #[test]
    fn test_snapshot_is_unaffected_by_later_mutation() {
        let (store, _) = engine_with(vec![accept("^ls")]);
        let before = store.snapshot().unwrap();

        store.create(reject("^rm")).unwrap();

        assert_eq!(before.len(), 1);
        assert_eq!(store.snapshot().unwrap().len(), 2);
    }

    /// Evaluations racing with updates see one whole rule or the other,
    /// never the pattern of one update paired with the action of another.
    #[test]
    fn test_concurrent_updates_never_expose_partial_rules() {
        const COMMITTED: [(&str, RuleAction); 2] = [
            ("^deploy", RuleAction::AutoReject),
            ("^deploy( |$)", RuleAction::AutoAccept),
        ];

        let (store, engine) = engine_with(vec![reject("^deploy")]);
        let id = store.list_ordered().unwrap()[0].id;

        thread::scope(|s| {
            s.spawn(|| {
                for i in 0..200 {
                    let (pattern, action) = COMMITTED[(i + 1) % 2];
                    store
                        .update(
                            id,
                            RulePatch {
                                pattern: Some(pattern.to_string()),
                                action: Some(action),
                                ..RulePatch::default()
                            },
                        )
                        .unwrap();
                }
            });
            s.spawn(|| {
                for _ in 0..200 {
                    let matched = engine.evaluate("deploy prod").unwrap().matched.unwrap();
                    assert_eq!(matched.rule_id, id);
                    let pair = (matched.pattern.as_str(), matched.action);
                    assert!(COMMITTED.contains(&pair), "torn rule observed: {:?}", pair);
                }
            });
        });

        let last = &store.list_ordered().unwrap()[0];
        assert_eq!((last.pattern.as_str(), last.action), COMMITTED[0]);
    }

    // ── 9. TOML seeding ───────────────────────────────────────────────────────

    #[test]
    fn test_from_toml_str_seeds_in_order() {
        let toml = r#"
            [[rules]]
            pattern = "rm -rf"
            action = "AUTO_REJECT"
            description = "No recursive forced deletes"

            [[rules]]
            pattern = "^git (pull|fetch|status)"
            action = "AUTO_ACCEPT"
            is_active = false
        "#;

        let store = InMemoryRuleStore::from_toml_str(toml).unwrap();
        let rules = store.list_ordered().unwrap();

        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].action, RuleAction::AutoReject);
        assert_eq!(rules[0].description.as_deref(), Some("No recursive forced deletes"));
        assert!(!rules[1].is_active);
    }

    #[test]
    fn test_toml_with_invalid_pattern_fails() {
        let toml = r#"
            [[rules]]
            pattern = "(unclosed"
            action = "AUTO_REJECT"
        "#;
        assert!(matches!(
            InMemoryRuleStore::from_toml_str(toml),
            Err(GatewayError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_toml_parse_error() {
        match InMemoryRuleStore::from_toml_str("this is not valid toml ][[[") {
            Err(GatewayError::Config { reason }) => {
                assert!(reason.contains("failed to parse rule TOML"), "got: {reason}")
            }
            other => panic!("expected Config error, got {:?}", other.map(|_| ())),
        }
    }
}
