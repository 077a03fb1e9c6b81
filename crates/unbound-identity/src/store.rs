//! In-memory identity store.
//!
//! Each account's mutable `User` sits behind its own `Mutex` inside a map
//! guarded by an `RwLock`. The map lock is only held long enough to find or
//! insert an account, so balance updates for different users never contend.
//! The credential digest and creation order never change, so they live
//! outside the mutex and `resolve` reads them without locking anything but
//! the matched account.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, RwLock,
    },
};

use chrono::Utc;
use tracing::{debug, info, warn};

use unbound_contracts::{
    error::{GatewayError, GatewayResult},
    user::{IssuedCredential, Role, User, UserId},
};
use unbound_core::traits::IdentityStore;

use crate::credential;

// ── Internal mutable state ────────────────────────────────────────────────────

pub(crate) struct Account {
    /// Creation order, used for listing.
    pub(crate) seq: u64,

    /// SHA-256 of the issued credential. The plaintext is never kept.
    pub(crate) digest: [u8; 32],

    pub(crate) user: Mutex<User>,
}

pub(crate) type AccountMap = HashMap<UserId, Arc<Account>>;

// ── Public store ──────────────────────────────────────────────────────────────

/// The reference `IdentityStore` and `CreditLedger`.
pub struct InMemoryIdentityStore {
    starting_credits: u64,
    next_seq: AtomicU64,
    pub(crate) accounts: RwLock<AccountMap>,
}

impl InMemoryIdentityStore {
    /// Create an empty store. New users receive `starting_credits`.
    pub fn new(starting_credits: u64) -> Self {
        Self {
            starting_credits,
            next_seq: AtomicU64::new(0),
            accounts: RwLock::new(HashMap::new()),
        }
    }

    pub fn starting_credits(&self) -> u64 {
        self.starting_credits
    }

    pub fn is_empty(&self) -> GatewayResult<bool> {
        Ok(self.read()?.is_empty())
    }

    pub(crate) fn read(&self) -> GatewayResult<std::sync::RwLockReadGuard<'_, AccountMap>> {
        self.accounts.read().map_err(|e| GatewayError::poisoned("identity store", e))
    }

    fn write(&self) -> GatewayResult<std::sync::RwLockWriteGuard<'_, AccountMap>> {
        self.accounts.write().map_err(|e| GatewayError::poisoned("identity store", e))
    }

    /// The account handle for `user_id`, with the map lock already released.
    pub(crate) fn account(&self, user_id: UserId) -> GatewayResult<Arc<Account>> {
        self.read()?
            .get(&user_id)
            .cloned()
            .ok_or_else(|| GatewayError::user_not_found(user_id))
    }
}

pub(crate) fn lock(account: &Account) -> GatewayResult<std::sync::MutexGuard<'_, User>> {
    account.user.lock().map_err(|e| GatewayError::poisoned("account", e))
}

// ── IdentityStore impl ────────────────────────────────────────────────────────

impl IdentityStore for InMemoryIdentityStore {
    fn resolve(&self, presented: &str) -> GatewayResult<User> {
        let well_formed = credential::is_well_formed(presented);
        let presented = credential::digest(presented);

        // Every account is compared, even after a hit, so the time taken
        // does not depend on which account (if any) matched.
        let found = {
            let accounts = self.read()?;
            let mut found = None;
            for account in accounts.values() {
                if credential::digests_equal(&account.digest, &presented) {
                    found = Some(Arc::clone(account));
                }
            }
            found
        };

        match found {
            Some(account) if well_formed => {
                let user = lock(&account)?.clone();
                Ok(user)
            }
            _ => {
                debug!("credential rejected");
                Err(GatewayError::Auth)
            }
        }
    }

    fn create(&self, name: &str, role: Role) -> GatewayResult<IssuedCredential> {
        let api_key = credential::generate();
        let user = User {
            id: UserId::new(),
            name: name.to_string(),
            role,
            credits: self.starting_credits,
            created_at: Utc::now(),
        };
        let account = Account {
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            digest: credential::digest(&api_key),
            user: Mutex::new(user.clone()),
        };

        self.write()?.insert(user.id, Arc::new(account));

        info!(user_id = %user.id, role = %user.role, credits = user.credits, "user created");
        Ok(IssuedCredential { user, api_key })
    }

    fn get(&self, user_id: UserId) -> GatewayResult<User> {
        let account = self.account(user_id)?;
        let user = lock(&account)?.clone();
        Ok(user)
    }

    fn list(&self) -> GatewayResult<Vec<User>> {
        let accounts = self.read()?;
        let mut users = accounts
            .values()
            .map(|account| lock(account).map(|user| (account.seq, user.clone())))
            .collect::<GatewayResult<Vec<_>>>()?;
        users.sort_by_key(|(seq, _)| *seq);
        Ok(users.into_iter().map(|(_, user)| user).collect())
    }

    fn set_credits(&self, user_id: UserId, balance: u64) -> GatewayResult<User> {
        let account = self.account(user_id)?;
        let mut user = lock(&account)?;
        let previous = user.credits;
        user.credits = balance;

        info!(user_id = %user_id, previous, balance, "credits set");
        Ok(user.clone())
    }

    fn delete(&self, acting: UserId, user_id: UserId) -> GatewayResult<()> {
        if acting == user_id {
            warn!(user_id = %user_id, "refused self-delete");
            return Err(GatewayError::SelfDelete);
        }

        self.write()?
            .remove(&user_id)
            .ok_or_else(|| GatewayError::user_not_found(user_id))?;

        info!(user_id = %user_id, deleted_by = %acting, "user deleted");
        Ok(())
    }
}
