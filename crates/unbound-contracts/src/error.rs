//! Error taxonomy for the Unbound gateway.
//!
//! All fallible operations return `GatewayResult<T>`. Every variant is a
//! distinct caller-visible outcome; the gateway never retries on its own.

use thiserror::Error;

/// The unified error type for the Unbound gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The presented credential is missing, malformed, or unknown.
    ///
    /// The message is fixed so callers cannot tell which of those it was.
    #[error("invalid or missing credential")]
    Auth,

    /// Authenticated, but the caller's role does not permit the operation.
    #[error("forbidden: '{action}' requires the admin role")]
    Forbidden { action: String },

    /// No record with this id exists.
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    /// A rule pattern failed to compile as a regular expression.
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// An admin tried to delete their own account.
    #[error("users cannot delete their own account")]
    SelfDelete,

    /// The balance cannot cover the charge. The balance was not changed.
    #[error("insufficient credits: balance {balance}, required {required}")]
    InsufficientCredits { balance: u64, required: u64 },

    /// A request field failed validation before any state changed.
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    /// A backing store could not complete the operation.
    ///
    /// Fatal to the current request.
    #[error("storage unavailable: {reason}")]
    StorageUnavailable { reason: String },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    Config { reason: String },
}

impl GatewayError {
    /// Stable machine-readable name for this error, used in API responses.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Auth => "unauthorized",
            GatewayError::Forbidden { .. } => "forbidden",
            GatewayError::NotFound { .. } => "not_found",
            GatewayError::InvalidPattern { .. } => "invalid_pattern",
            GatewayError::SelfDelete => "self_delete",
            GatewayError::InsufficientCredits { .. } => "insufficient_credits",
            GatewayError::InvalidInput { .. } => "invalid_input",
            GatewayError::StorageUnavailable { .. } => "storage_unavailable",
            GatewayError::Config { .. } => "config",
        }
    }

    pub fn user_not_found(id: impl ToString) -> Self {
        GatewayError::NotFound { kind: "user", id: id.to_string() }
    }

    pub fn rule_not_found(id: impl ToString) -> Self {
        GatewayError::NotFound { kind: "rule", id: id.to_string() }
    }

    pub fn poisoned(store: &str, err: impl std::fmt::Display) -> Self {
        GatewayError::StorageUnavailable {
            reason: format!("{} lock poisoned: {}", store, err),
        }
    }
}

/// Convenience alias used throughout the Unbound crates.
pub type GatewayResult<T> = Result<T, GatewayError>;
