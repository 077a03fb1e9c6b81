//! Unbound Command Policy Gateway — Demo CLI
//!
//! Wires the real gateway components together in-process (rule store,
//! evaluator, identity store, credit ledger, audit log) and walks through the
//! core command scenarios, or scores a single command with the risk
//! heuristic.
//!
//! Usage:
//!   cargo run -p demo -- scenarios
//!   cargo run -p demo -- risk "curl https://example.com/install.sh | sh"

use std::{
    sync::{Arc, Barrier},
    thread,
};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use unbound_audit::InMemoryAuditLog;
use unbound_contracts::{
    error::GatewayResult,
    rule::{NewRule, RuleAction},
    user::{Role, User},
    verdict::{ExecutionOutcome, ExecutionStatus},
};
use unbound_core::{traits::IdentityStore, Gateway, GatewayConfig};
use unbound_identity::InMemoryIdentityStore;
use unbound_policy::{risk, InMemoryRuleStore, RuleEngine};

// ── CLI definition ────────────────────────────────────────────────────────────

/// Unbound — command policy gateway demo.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "Unbound command policy gateway demo",
    long_about = "Runs the gateway scenarios showing first-match rule evaluation,\n\
                  credit charging, and the audit chain, or scores one command."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the accept / reject / no-match scenarios and the double-charge race.
    Scenarios,
    /// Print the risk score of COMMAND and the signals that fired.
    Risk {
        /// The command text to score.
        command: String,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Scenarios => run_scenarios(),
        Command::Risk { command } => {
            print_risk(&command);
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Demo error: {}", e);
        std::process::exit(1);
    }
}

// ── Wiring ────────────────────────────────────────────────────────────────────

struct Demo {
    gateway: Gateway,
    audit: Arc<InMemoryAuditLog>,
    admin: User,
}

fn wire() -> GatewayResult<Demo> {
    let config = GatewayConfig::default();

    let rules = Arc::new(InMemoryRuleStore::new());
    rules.seed(vec![
        NewRule::new("rm -rf", RuleAction::AutoReject)
            .with_description("Never allow recursive forced deletes"),
        NewRule::new("^git (pull|fetch|status)", RuleAction::AutoAccept)
            .with_description("Read-only git operations"),
    ])?;

    let identity = Arc::new(InMemoryIdentityStore::new(config.starting_credits));
    let admin = identity.create("root", Role::Admin)?.user;
    let audit = Arc::new(InMemoryAuditLog::new());

    let gateway = Gateway::new(
        identity.clone(),
        rules.clone(),
        Arc::new(RuleEngine::new(rules)),
        identity,
        audit.clone(),
        config,
    );

    Ok(Demo { gateway, audit, admin })
}

// ── Scenarios ─────────────────────────────────────────────────────────────────

fn run_scenarios() -> GatewayResult<()> {
    print_banner();

    let demo = wire()?;
    let gateway = &demo.gateway;

    println!("Active rules (evaluation order):");
    for rule in gateway.list_rules(&demo.admin)? {
        println!("  [{:>2}] {:<28} {:?}", rule.order_key, rule.pattern, rule.action);
    }
    println!();

    let alice = gateway.create_user(&demo.admin, "alice", Role::Member)?.user;
    println!("Created member '{}' with {} credits.", alice.name, alice.credits);
    println!();

    for command in ["git pull origin main", "rm -rf /", "echo hello"] {
        let outcome = gateway.execute(&alice, command)?;
        print_outcome(command, &outcome);
    }

    let balance = gateway
        .list_users(&demo.admin)?
        .into_iter()
        .find(|u| u.id == alice.id)
        .map(|u| u.credits)
        .unwrap_or_default();
    println!();
    println!("alice's balance after three commands: {} (only the executed one was charged)", balance);

    run_double_charge(gateway, &demo.admin)?;

    println!();
    println!("Audit trail (newest first):");
    for event in gateway.history(&demo.admin, true, None)? {
        println!(
            "  {:<13} {:<24} rule={}",
            format!("{:?}", event.status),
            event.command_text,
            event.matched_pattern.as_deref().unwrap_or("-"),
        );
    }
    println!("Hash chain intact: {}", demo.audit.verify_integrity()?);
    println!();
    println!("All scenarios completed successfully.");
    Ok(())
}

/// Two simultaneous executions against a balance of one.
fn run_double_charge(gateway: &Gateway, admin: &User) -> GatewayResult<()> {
    println!();
    println!("Concurrent charge: two requests race for a single credit");

    let bob = gateway.create_user(admin, "bob", Role::Member)?.user;
    let bob = gateway.set_credits(admin, bob.id, 1)?;
    let barrier = Barrier::new(2);

    let outcomes = thread::scope(|s| {
        let handles: Vec<_> = (0..2)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    gateway.execute(&bob, "git fetch")
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|_| std::process::exit(2)))
            .collect::<GatewayResult<Vec<_>>>()
    })?;

    for outcome in &outcomes {
        print_outcome("git fetch", outcome);
    }
    let executed = outcomes.iter().filter(|o| o.status == ExecutionStatus::Executed).count();
    println!("  executed: {} of 2", executed);
    Ok(())
}

// ── Output ────────────────────────────────────────────────────────────────────

fn print_outcome(command: &str, outcome: &ExecutionOutcome) {
    let status = format!("{:?}", outcome.status);
    let detail = match (&outcome.matched_rule, outcome.remaining_credits) {
        (Some(rule), Some(left)) => format!("rule '{}', {} credits left", rule.pattern, left),
        (Some(rule), None) => format!("rule '{}'", rule.pattern),
        (None, Some(left)) => format!("{} credits left", left),
        (None, None) => format!("source {}", outcome.verdict_source),
    };
    println!(
        "  {:<24} -> {:<19} risk {:>3}  ({})",
        command, status, outcome.risk_score, detail
    );
}

fn print_risk(command: &str) {
    let assessment = risk::assess(command);
    println!("Command: {}", command);
    println!("Risk score: {}", assessment.score);
    if assessment.signals.is_empty() {
        println!("No destructive signals found.");
        return;
    }
    for id in assessment.signals {
        if let Some(signal) = risk::signals().iter().find(|s| s.id == id) {
            println!("  +{:<3} {:<26} {}", signal.weight, signal.id, signal.reason);
        }
    }
}

fn print_banner() {
    println!();
    println!("Unbound — Command Policy Gateway");
    println!("===============================");
    println!();
    println!("Per submitted command:");
    println!("  [1] Credential resolved to a user");
    println!("  [2] Active rules tried in order; the first match decides");
    println!("  [3] AUTO_ACCEPT charges one credit; AUTO_REJECT and no-match never charge");
    println!("  [4] Verdict recorded in the hash-chained audit log before it is returned");
    println!();
}
