//! Hash-chained implementation of `AuditLog`.
//!
//! `InMemoryAuditLog` keeps every entry in a `Vec` behind a `Mutex`. When
//! opened with a journal it writes each entry to disk before appending it
//! in memory, so an entry that is visible to `query` is always durable.

use std::{path::Path, sync::Mutex};

use tracing::{debug, error};

use unbound_contracts::{
    command::{CommandEvent, HistoryScope},
    error::{GatewayError, GatewayResult},
};
use unbound_core::traits::AuditLog;

use crate::{
    chain::{hash_entry, verify_chain},
    entry::AuditEntry,
    journal::Journal,
};

// ── Internal mutable state ────────────────────────────────────────────────────

pub(crate) struct AuditState {
    /// All entries, in append order.
    pub(crate) entries: Vec<AuditEntry>,

    /// The `this_hash` of the last entry, or `GENESIS_HASH` when empty.
    pub(crate) last_hash: String,

    pub(crate) journal: Option<Journal>,
}

// ── Public log ────────────────────────────────────────────────────────────────

/// An append-only audit log backed by a SHA-256 hash chain.
pub struct InMemoryAuditLog {
    pub(crate) state: Mutex<AuditState>,
}

impl Default for InMemoryAuditLog {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryAuditLog {
    /// A volatile log; entries are lost when the process exits.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(AuditState {
                entries: Vec::new(),
                last_hash: AuditEntry::GENESIS_HASH.to_string(),
                journal: None,
            }),
        }
    }

    /// A log persisted to the JSON-lines journal at `path`.
    ///
    /// Existing entries are replayed and verified; a broken chain is refused.
    pub fn open(path: impl AsRef<Path>) -> GatewayResult<Self> {
        let (journal, entries) = Journal::open(path)?;
        let last_hash = entries
            .last()
            .map(|e| e.this_hash.clone())
            .unwrap_or_else(|| AuditEntry::GENESIS_HASH.to_string());

        Ok(Self {
            state: Mutex::new(AuditState {
                entries,
                last_hash,
                journal: Some(journal),
            }),
        })
    }

    fn lock(&self) -> GatewayResult<std::sync::MutexGuard<'_, AuditState>> {
        self.state.lock().map_err(|e| GatewayError::poisoned("audit log", e))
    }

    /// Every entry in chain order.
    pub fn entries(&self) -> GatewayResult<Vec<AuditEntry>> {
        Ok(self.lock()?.entries.clone())
    }

    pub fn len(&self) -> GatewayResult<usize> {
        Ok(self.lock()?.entries.len())
    }

    pub fn is_empty(&self) -> GatewayResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Re-verify the whole chain.
    pub fn verify_integrity(&self) -> GatewayResult<bool> {
        Ok(verify_chain(&self.lock()?.entries))
    }
}

// ── AuditLog impl ─────────────────────────────────────────────────────────────

impl AuditLog for InMemoryAuditLog {
    fn record(&self, event: &CommandEvent) -> GatewayResult<()> {
        let mut state = self.lock()?;

        let sequence = state.entries.len() as u64;
        let prev_hash = state.last_hash.clone();
        let this_hash = hash_entry(sequence, event, &prev_hash)?;

        let entry = AuditEntry {
            sequence,
            event: event.clone(),
            prev_hash,
            this_hash: this_hash.clone(),
        };

        if let Some(journal) = state.journal.as_mut() {
            if let Err(e) = journal.append(&entry) {
                error!(event_id = %event.id, error = %e, "audit append failed");
                return Err(e);
            }
        }

        state.entries.push(entry);
        state.last_hash = this_hash;

        debug!(event_id = %event.id, sequence, status = ?event.status, "audit entry recorded");
        Ok(())
    }

    fn query(&self, scope: HistoryScope, limit: Option<usize>) -> GatewayResult<Vec<CommandEvent>> {
        let state = self.lock()?;
        Ok(state
            .entries
            .iter()
            .rev()
            .filter(|entry| scope.includes(&entry.event))
            .take(limit.unwrap_or(usize::MAX))
            .map(|entry| entry.event.clone())
            .collect())
    }
}
