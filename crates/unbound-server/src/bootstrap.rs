//! Wires the reference components into a `Gateway` from `Settings`.

use std::sync::Arc;

use tracing::info;

use unbound_audit::InMemoryAuditLog;
use unbound_contracts::{
    error::GatewayResult,
    user::{IssuedCredential, Role},
};
use unbound_core::{traits::IdentityStore, Gateway};
use unbound_identity::InMemoryIdentityStore;
use unbound_policy::{InMemoryRuleStore, RuleEngine};

use crate::settings::Settings;

pub struct Bootstrapped {
    pub gateway: Arc<Gateway>,

    /// Set when `bootstrap_admin` created an account. The only copy of its key.
    pub admin: Option<IssuedCredential>,
}

/// Build the gateway described by `settings`.
///
/// Seed rules are created in file order. When `bootstrap_admin` is set and
/// no user exists yet, an admin is created directly in the identity store.
pub fn build(settings: &Settings) -> GatewayResult<Bootstrapped> {
    settings.gateway.validate()?;

    let rules = Arc::new(InMemoryRuleStore::new());
    rules.seed(settings.rules.clone())?;

    let identity = Arc::new(InMemoryIdentityStore::new(settings.gateway.starting_credits));

    let audit = match &settings.audit.journal_path {
        Some(path) => InMemoryAuditLog::open(path)?,
        None => InMemoryAuditLog::new(),
    };

    let admin = match settings.bootstrap_admin.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() && identity.is_empty()? => {
            let issued = identity.create(name, Role::Admin)?;
            info!(user_id = %issued.user.id, "bootstrap admin created");
            Some(issued)
        }
        _ => None,
    };

    let gateway = Gateway::new(
        identity.clone(),
        rules.clone(),
        Arc::new(RuleEngine::new(rules)),
        identity,
        Arc::new(audit),
        settings.gateway.clone(),
    );

    Ok(Bootstrapped { gateway: Arc::new(gateway), admin })
}
