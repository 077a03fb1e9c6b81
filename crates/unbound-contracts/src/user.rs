//! Member identity types.
//!
//! A `User` is the public view of an account. The credential digest lives
//! only inside the identity store and never appears on these types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque, unique identifier for a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub uuid::Uuid);

impl UserId {
    /// Create a new, unique user ID.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The two privilege levels of the console.
///
/// Admins manage users and rules and may read every user's history.
/// Members may only submit commands and read their own history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Admin,
}

impl Role {
    pub fn is_admin(self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Member => f.write_str("member"),
            Role::Admin => f.write_str("admin"),
        }
    }
}

/// A user account as seen by every component outside the identity store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub role: Role,
    /// Remaining command credits. Only the credit ledger mutates this.
    pub credits: u64,
    pub created_at: DateTime<Utc>,
}

/// The one-time result of creating a user.
///
/// `api_key` is the only copy of the plaintext credential that will ever
/// exist; the store keeps a digest. `Debug` redacts it.
#[derive(Clone, Serialize, Deserialize)]
pub struct IssuedCredential {
    pub user: User,
    pub api_key: String,
}

impl fmt::Debug for IssuedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedCredential")
            .field("user", &self.user)
            .field("api_key", &"<redacted>")
            .finish()
    }
}
