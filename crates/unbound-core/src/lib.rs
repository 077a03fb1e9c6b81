//! # unbound-core
//!
//! The command policy gateway: component traits and the facade that wires
//! them into the per-request state machine.
//!
//! This crate provides:
//! - The five component traits (`IdentityStore`, `RuleStore`,
//!   `CommandEvaluator`, `CreditLedger`, `AuditLog`)
//! - `GatewayConfig`, the policy tunables
//! - The `Gateway` that enforces authorization and verdict application
//!
//! ## Usage
//!
//! ```rust,ignore
//! use unbound_core::{Gateway, GatewayConfig};
//!
//! let gateway = Gateway::new(identity, rules, evaluator, ledger, audit, GatewayConfig::default());
//! let user = gateway.authenticate(Some(api_key))?;
//! let outcome = gateway.execute(&user, "git pull origin main")?;
//! ```

pub mod config;
pub mod gateway;
pub mod traits;

pub use config::{GatewayConfig, NoMatchPolicy};
pub use gateway::{Gateway, GatewayStats};
