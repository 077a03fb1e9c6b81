//! Hash-chain primitives: hashing and chain integrity verification.
//!
//! Hash input layout (bytes, in order):
//!   1. sequence as 8-byte little-endian
//!   2. prev_hash as UTF-8 bytes (64 ASCII hex chars)
//!   3. canonical JSON of the event (serde_json, no pretty-printing)

use sha2::{Digest, Sha256};

use unbound_contracts::{
    command::CommandEvent,
    error::{GatewayError, GatewayResult},
};

use crate::entry::AuditEntry;

/// Compute the SHA-256 hash for one audit entry.
///
/// Returns a lowercase 64-character hex string.
pub fn hash_entry(sequence: u64, event: &CommandEvent, prev_hash: &str) -> GatewayResult<String> {
    let event_json = serde_json::to_vec(event).map_err(|e| GatewayError::StorageUnavailable {
        reason: format!("failed to serialize audit event: {}", e),
    })?;

    let mut hasher = Sha256::new();
    hasher.update(sequence.to_le_bytes());
    hasher.update(prev_hash.as_bytes());
    hasher.update(&event_json);

    Ok(hex::encode(hasher.finalize()))
}

/// Verify the integrity of a hash chain.
///
/// Returns `true` when, for every entry:
///
/// 1. `sequence` equals its position in the slice;
/// 2. `prev_hash` equals the previous entry's `this_hash` (or
///    `GENESIS_HASH` for the first);
/// 3. `this_hash` matches the value recomputed from its own fields.
///
/// An empty chain is valid.
pub fn verify_chain(entries: &[AuditEntry]) -> bool {
    let mut expected_prev = AuditEntry::GENESIS_HASH;

    for (position, entry) in entries.iter().enumerate() {
        if entry.sequence != position as u64 || entry.prev_hash != expected_prev {
            return false;
        }

        match hash_entry(entry.sequence, &entry.event, &entry.prev_hash) {
            Ok(recomputed) if recomputed == entry.this_hash => {}
            _ => return false,
        }

        expected_prev = entry.this_hash.as_str();
    }

    true
}
