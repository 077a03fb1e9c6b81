//! The Unbound gateway: the request-handling facade.
//!
//! Every submitted command follows one path:
//!
//!   RECEIVED → EVALUATED → (CHARGED → EXECUTED) | BLOCKED | NO_MATCH | INSUFFICIENT_CREDITS
//!
//! Credits are only debited on the accept path, and the debit happens before
//! the audit write so an EXECUTED event always corresponds to a real charge.
//! A command that cannot be paid for is never written to the audit log.
//!
//! Authorization lives here and only here: the component traits trust their
//! caller, so every admin operation goes through `require_admin`.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use unbound_contracts::{
    command::{CommandEvent, CommandStatus, EventId, HistoryScope, VerdictSource},
    error::{GatewayError, GatewayResult},
    rule::{NewRule, Rule, RuleAction, RuleId, RulePatch},
    user::{IssuedCredential, Role, User, UserId},
    verdict::{Evaluation, ExecutionOutcome, ExecutionStatus, RuleMatch},
};

use crate::{
    config::{GatewayConfig, NoMatchPolicy},
    traits::{AuditLog, CommandEvaluator, CreditLedger, IdentityStore, RuleStore},
};

/// Counts reported by the health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewayStats {
    pub users: usize,
    pub rules: usize,
}

/// How an evaluation resolves before any side effect.
enum Decision {
    /// An accept rule matched; the command executes if it can be paid for.
    Execute(RuleMatch),
    /// A terminal verdict that never charges.
    Settle {
        status: CommandStatus,
        source: VerdictSource,
        matched: Option<RuleMatch>,
    },
}

/// The facade that owns the trusted components.
///
/// Construct one per process and share it behind an `Arc`; every method
/// takes `&self`.
pub struct Gateway {
    identity: Arc<dyn IdentityStore>,
    rules: Arc<dyn RuleStore>,
    evaluator: Arc<dyn CommandEvaluator>,
    ledger: Arc<dyn CreditLedger>,
    audit: Arc<dyn AuditLog>,
    config: GatewayConfig,
}

impl Gateway {
    pub fn new(
        identity: Arc<dyn IdentityStore>,
        rules: Arc<dyn RuleStore>,
        evaluator: Arc<dyn CommandEvaluator>,
        ledger: Arc<dyn CreditLedger>,
        audit: Arc<dyn AuditLog>,
        config: GatewayConfig,
    ) -> Self {
        Self { identity, rules, evaluator, ledger, audit, config }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    // ── Authentication ───────────────────────────────────────────────────────

    /// Resolve the credential presented with a request.
    ///
    /// A missing header and a bad key produce the same `Auth` error.
    pub fn authenticate(&self, credential: Option<&str>) -> GatewayResult<User> {
        let Some(credential) = credential else {
            warn!("request without credential rejected");
            return Err(GatewayError::Auth);
        };

        match self.identity.resolve(credential) {
            Ok(user) => {
                debug!(user_id = %user.id, role = %user.role, "credential resolved");
                Ok(user)
            }
            Err(GatewayError::Auth) => {
                warn!("credential rejected");
                Err(GatewayError::Auth)
            }
            Err(other) => Err(other),
        }
    }

    // ── Users (admin) ────────────────────────────────────────────────────────

    pub fn list_users(&self, actor: &User) -> GatewayResult<Vec<User>> {
        require_admin(actor, "list users")?;
        self.identity.list()
    }

    pub fn create_user(&self, actor: &User, name: &str, role: Role) -> GatewayResult<IssuedCredential> {
        require_admin(actor, "create users")?;
        let name = name.trim();
        if name.is_empty() {
            return Err(GatewayError::InvalidInput {
                reason: "user name must not be empty".to_string(),
            });
        }

        let issued = self.identity.create(name, role)?;
        info!(
            actor = %actor.id,
            user_id = %issued.user.id,
            role = %issued.user.role,
            "user created"
        );
        Ok(issued)
    }

    pub fn set_credits(&self, actor: &User, user_id: UserId, credits: u64) -> GatewayResult<User> {
        require_admin(actor, "update credits")?;
        let user = self.identity.set_credits(user_id, credits)?;
        info!(actor = %actor.id, user_id = %user_id, credits, "credits updated");
        Ok(user)
    }

    pub fn delete_user(&self, actor: &User, user_id: UserId) -> GatewayResult<()> {
        require_admin(actor, "delete users")?;
        self.identity.delete(actor.id, user_id)?;
        info!(actor = %actor.id, user_id = %user_id, "user deleted");
        Ok(())
    }

    // ── Rules ────────────────────────────────────────────────────────────────

    /// The full ordered rule list. Readable by any authenticated user.
    pub fn list_rules(&self, _actor: &User) -> GatewayResult<Vec<Rule>> {
        self.rules.list_ordered()
    }

    pub fn create_rule(&self, actor: &User, rule: NewRule) -> GatewayResult<Rule> {
        require_admin(actor, "create rules")?;
        let rule = self.rules.create(rule)?;
        info!(
            actor = %actor.id,
            rule_id = %rule.id,
            pattern = %rule.pattern,
            order_key = rule.order_key,
            "rule created"
        );
        Ok(rule)
    }

    pub fn update_rule(&self, actor: &User, rule_id: RuleId, patch: RulePatch) -> GatewayResult<Rule> {
        require_admin(actor, "update rules")?;
        let rule = self.rules.update(rule_id, patch)?;
        info!(actor = %actor.id, rule_id = %rule.id, "rule updated");
        Ok(rule)
    }

    pub fn delete_rule(&self, actor: &User, rule_id: RuleId) -> GatewayResult<()> {
        require_admin(actor, "delete rules")?;
        self.rules.delete(rule_id)?;
        info!(actor = %actor.id, rule_id = %rule_id, "rule deleted");
        Ok(())
    }

    // ── Commands ─────────────────────────────────────────────────────────────

    /// Evaluate one submitted command and apply its verdict.
    ///
    /// # Pipeline
    ///
    /// 1. Evaluate against the current rule snapshot
    /// 2. Reject match → record BLOCKED, no charge
    /// 3. No match → risk threshold, then the `no_match` policy; record, no charge
    /// 4. Accept match → charge `command_cost`:
    ///    - short balance → `InsufficientCredits` outcome, nothing recorded
    ///    - charged → record EXECUTED; if the record fails, refund and fail
    ///
    /// # Errors
    ///
    /// Storage faults abort the request. Verdicts, including
    /// INSUFFICIENT_CREDITS, are `Ok` outcomes.
    pub fn execute(&self, actor: &User, command_text: &str) -> GatewayResult<ExecutionOutcome> {
        if command_text.trim().is_empty() {
            return Err(GatewayError::InvalidInput {
                reason: "command_text must not be empty".to_string(),
            });
        }

        let evaluation = self.evaluator.evaluate(command_text)?;
        debug!(
            user_id = %actor.id,
            risk_score = evaluation.risk_score,
            matched = evaluation.matched.is_some(),
            "command evaluated"
        );

        let risk_score = evaluation.risk_score;
        match self.decide(evaluation) {
            Decision::Execute(matched) => self.charge_and_record(actor, command_text, matched, risk_score),
            Decision::Settle { status, source, matched } => {
                let event = self.event(actor.id, command_text, status, source, matched.as_ref(), risk_score, 0);
                self.audit.record(&event)?;

                match status {
                    CommandStatus::Blocked => warn!(
                        user_id = %actor.id,
                        event_id = %event.id,
                        verdict_source = %source,
                        risk_score,
                        "command blocked"
                    ),
                    _ => info!(user_id = %actor.id, event_id = %event.id, "command matched no rule"),
                }

                Ok(ExecutionOutcome {
                    status: status.into(),
                    remaining_credits: None,
                    matched_rule: matched,
                    risk_score,
                    verdict_source: source,
                    event_id: Some(event.id),
                })
            }
        }
    }

    /// Command history under the caller's scope, newest first.
    ///
    /// `admin_view` widens the scope to every user and is refused for members.
    pub fn history(
        &self,
        actor: &User,
        admin_view: bool,
        limit: Option<usize>,
    ) -> GatewayResult<Vec<CommandEvent>> {
        let scope = if admin_view {
            require_admin(actor, "view all history")?;
            HistoryScope::All
        } else {
            HistoryScope::User(actor.id)
        };
        self.audit.query(scope, limit)
    }

    pub fn stats(&self) -> GatewayResult<GatewayStats> {
        Ok(GatewayStats {
            users: self.identity.list()?.len(),
            rules: self.rules.list_ordered()?.len(),
        })
    }

    // ── Internals ────────────────────────────────────────────────────────────

    fn decide(&self, evaluation: Evaluation) -> Decision {
        if let Some(matched) = evaluation.matched {
            return match matched.action {
                RuleAction::AutoAccept => Decision::Execute(matched),
                RuleAction::AutoReject => Decision::Settle {
                    status: CommandStatus::Blocked,
                    source: VerdictSource::RuleEngine,
                    matched: Some(matched),
                },
            };
        }

        if let Some(threshold) = self.config.risk_block_threshold {
            if evaluation.risk_score >= threshold {
                return Decision::Settle {
                    status: CommandStatus::Blocked,
                    source: VerdictSource::RiskHeuristic,
                    matched: None,
                };
            }
        }

        let status = match self.config.no_match {
            NoMatchPolicy::Report => CommandStatus::NoMatch,
            NoMatchPolicy::Block => CommandStatus::Blocked,
        };
        Decision::Settle { status, source: VerdictSource::DefaultPolicy, matched: None }
    }

    fn charge_and_record(
        &self,
        actor: &User,
        command_text: &str,
        matched: RuleMatch,
        risk_score: u32,
    ) -> GatewayResult<ExecutionOutcome> {
        let cost = self.config.command_cost;

        let remaining = match self.ledger.charge(actor.id, cost) {
            Ok(remaining) => remaining,
            Err(GatewayError::InsufficientCredits { balance, required }) => {
                warn!(user_id = %actor.id, balance, required, "insufficient credits, command not executed");
                return Ok(ExecutionOutcome {
                    status: ExecutionStatus::InsufficientCredits,
                    remaining_credits: Some(balance),
                    matched_rule: Some(matched),
                    risk_score,
                    verdict_source: VerdictSource::RuleEngine,
                    event_id: None,
                });
            }
            Err(other) => return Err(other),
        };

        let event = self.event(
            actor.id,
            command_text,
            CommandStatus::Executed,
            VerdictSource::RuleEngine,
            Some(&matched),
            risk_score,
            cost,
        );

        if let Err(err) = self.audit.record(&event) {
            // The charge must not outlive a missing audit entry.
            if let Err(refund_err) = self.ledger.refund(actor.id, cost) {
                error!(
                    user_id = %actor.id,
                    amount = cost,
                    error = %refund_err,
                    "refund after failed audit write also failed"
                );
            }
            return Err(err);
        }

        info!(
            user_id = %actor.id,
            event_id = %event.id,
            rule_id = %matched.rule_id,
            remaining,
            "command executed"
        );

        Ok(ExecutionOutcome {
            status: ExecutionStatus::Executed,
            remaining_credits: Some(remaining),
            matched_rule: Some(matched),
            risk_score,
            verdict_source: VerdictSource::RuleEngine,
            event_id: Some(event.id),
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn event(
        &self,
        user_id: UserId,
        command_text: &str,
        status: CommandStatus,
        verdict_source: VerdictSource,
        matched: Option<&RuleMatch>,
        risk_score: u32,
        credits_used: u64,
    ) -> CommandEvent {
        CommandEvent {
            id: EventId::new(),
            user_id,
            command_text: command_text.to_string(),
            status,
            matched_rule_id: matched.map(|m| m.rule_id),
            matched_pattern: matched.map(|m| m.pattern.clone()),
            verdict_source,
            risk_score,
            credits_used,
            timestamp: Utc::now(),
        }
    }
}

fn require_admin(actor: &User, action: &str) -> GatewayResult<()> {
    if actor.role.is_admin() {
        Ok(())
    } else {
        warn!(user_id = %actor.id, action, "non-admin caller refused");
        Err(GatewayError::Forbidden { action: action.to_string() })
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
