//! Audit entry type.
//!
//! `AuditEntry` is a single link in the hash chain: it wraps a
//! `CommandEvent` with its position and the SHA-256 hashes that make
//! tampering detectable.

use serde::{Deserialize, Serialize};

use unbound_contracts::command::CommandEvent;

/// A single entry in the SHA-256 hash chain.
///
/// Each entry commits to the previous one via `prev_hash`. Modifying any
/// field, including those of the embedded `event`, invalidates `this_hash`
/// and every later `prev_hash`, which `verify_chain` detects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Position in the chain, starting at 0.
    pub sequence: u64,

    pub event: CommandEvent,

    /// `this_hash` of the previous entry, or `GENESIS_HASH` for the first.
    pub prev_hash: String,

    /// SHA-256 (hex) over (sequence, prev_hash, canonical JSON of event).
    pub this_hash: String,
}

impl AuditEntry {
    /// The `prev_hash` of the first entry in every chain: 64 hex zeros.
    pub const GENESIS_HASH: &'static str =
        "0000000000000000000000000000000000000000000000000000000000000000";
}
