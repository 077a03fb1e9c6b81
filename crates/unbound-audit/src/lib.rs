//! # unbound-audit
//!
//! Immutable, append-only, SHA-256 hash-chained record of every command the
//! Unbound gateway evaluates.
//!
//! ## Overview
//!
//! Each `CommandEvent` is wrapped in an [`AuditEntry`] that links to the
//! previous entry via its SHA-256 hash. Tampering with any entry, even a
//! single byte, breaks the chain and is detected by [`verify_chain`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use unbound_audit::InMemoryAuditLog;
//! use unbound_core::traits::AuditLog;
//!
//! let log = InMemoryAuditLog::open("var/audit.jsonl")?;
//! log.record(&event)?;
//! let mine = log.query(HistoryScope::User(user_id), Some(20))?;
//! ```

pub mod chain;
pub mod entry;
pub mod journal;
pub mod memory;

pub use chain::{hash_entry, verify_chain};
pub use entry::AuditEntry;
pub use journal::Journal;
pub use memory::InMemoryAuditLog;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::{fs, io::Write};

    use chrono::Utc;

    use unbound_contracts::{
        command::{CommandEvent, CommandStatus, EventId, HistoryScope, VerdictSource},
        error::GatewayError,
        rule::RuleId,
        user::UserId,
    };
    use unbound_core::traits::AuditLog;

    use super::{verify_chain, AuditEntry, InMemoryAuditLog};

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn make_event(user_id: UserId, text: &str) -> CommandEvent {
        CommandEvent {
            id: EventId::new(),
            user_id,
            command_text: text.to_string(),
            status: CommandStatus::Executed,
            matched_rule_id: Some(RuleId::new()),
            matched_pattern: Some("^git".to_string()),
            verdict_source: VerdictSource::RuleEngine,
            risk_score: 0,
            credits_used: 1,
            timestamp: Utc::now(),
        }
    }

    fn texts(events: &[CommandEvent]) -> Vec<&str> {
        events.iter().map(|e| e.command_text.as_str()).collect()
    }

    // ── 1. chain ──────────────────────────────────────────────────────────────

    #[test]
    fn test_hash_chain_integrity() {
        let log = InMemoryAuditLog::new();
        let user = UserId::new();
        for text in ["first", "second", "third"] {
            log.record(&make_event(user, text)).unwrap();
        }

        assert!(log.verify_integrity().unwrap());
        let entries = log.entries().unwrap();
        assert_eq!(entries[0].prev_hash, AuditEntry::GENESIS_HASH);
        for (idx, entry) in entries.iter().enumerate() {
            assert_eq!(entry.sequence, idx as u64);
        }
        assert_eq!(entries[1].prev_hash, entries[0].this_hash);
    }

    #[test]
    fn test_tamper_detection() {
        let log = InMemoryAuditLog::new();
        let user = UserId::new();
        log.record(&make_event(user, "git status")).unwrap();
        log.record(&make_event(user, "ls")).unwrap();

        {
            let mut state = log.state.lock().unwrap();
            state.entries[0].event.command_text = "rm -rf /".to_string();
        }

        assert!(!log.verify_integrity().unwrap());
    }

    #[test]
    fn test_removed_entry_breaks_chain() {
        let log = InMemoryAuditLog::new();
        let user = UserId::new();
        for text in ["a", "b", "c"] {
            log.record(&make_event(user, text)).unwrap();
        }

        let mut entries = log.entries().unwrap();
        entries.remove(1);
        assert!(!verify_chain(&entries));
    }

    #[test]
    fn test_verify_empty() {
        assert!(InMemoryAuditLog::new().verify_integrity().unwrap());
        assert!(verify_chain(&[]));
    }

    // ── 2. queries ────────────────────────────────────────────────────────────

    #[test]
    fn test_query_is_newest_first_with_limit() {
        let log = InMemoryAuditLog::new();
        let user = UserId::new();
        for text in ["one", "two", "three"] {
            log.record(&make_event(user, text)).unwrap();
        }

        let all = log.query(HistoryScope::User(user), None).unwrap();
        assert_eq!(texts(&all), vec!["three", "two", "one"]);

        let latest = log.query(HistoryScope::User(user), Some(2)).unwrap();
        assert_eq!(texts(&latest), vec!["three", "two"]);

        assert!(log.query(HistoryScope::All, Some(0)).unwrap().is_empty());
    }

    /// A user-scoped query never returns another user's events, however
    /// many are interleaved.
    #[test]
    fn test_user_scope_never_leaks() {
        let log = InMemoryAuditLog::new();
        let alice = UserId::new();
        let bob = UserId::new();

        for i in 0..2_000 {
            let user = if i % 3 == 0 { alice } else { bob };
            log.record(&make_event(user, &format!("cmd-{i}"))).unwrap();
        }

        let alices = log.query(HistoryScope::User(alice), None).unwrap();
        assert_eq!(alices.len(), 667);
        assert!(alices.iter().all(|e| e.user_id == alice));

        let everything = log.query(HistoryScope::All, None).unwrap();
        assert_eq!(everything.len(), 2_000);
    }

    /// The matched pattern is kept as recorded even after the rule is gone.
    #[test]
    fn test_events_keep_pattern_snapshot() {
        let log = InMemoryAuditLog::new();
        let user = UserId::new();
        let event = make_event(user, "git pull");
        log.record(&event).unwrap();

        let stored = &log.query(HistoryScope::All, None).unwrap()[0];
        assert_eq!(stored, &event);
        assert_eq!(stored.matched_pattern.as_deref(), Some("^git"));
    }

    // ── 3. journal ────────────────────────────────────────────────────────────

    #[test]
    fn test_journal_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit").join("events.jsonl");
        let user = UserId::new();

        {
            let log = InMemoryAuditLog::open(&path).unwrap();
            log.record(&make_event(user, "first")).unwrap();
            log.record(&make_event(user, "second")).unwrap();
        }

        let reopened = InMemoryAuditLog::open(&path).unwrap();
        assert_eq!(reopened.len().unwrap(), 2);
        reopened.record(&make_event(user, "third")).unwrap();

        assert!(reopened.verify_integrity().unwrap());
        let history = reopened.query(HistoryScope::User(user), None).unwrap();
        assert_eq!(texts(&history), vec!["third", "second", "first"]);

        let lines = fs::read_to_string(&path).unwrap();
        assert_eq!(lines.lines().count(), 3);
    }

    #[test]
    fn test_tampered_journal_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let user = UserId::new();

        {
            let log = InMemoryAuditLog::open(&path).unwrap();
            log.record(&make_event(user, "git status")).unwrap();
            log.record(&make_event(user, "ls")).unwrap();
        }

        let contents = fs::read_to_string(&path).unwrap();
        fs::write(&path, contents.replace("git status", "git push")).unwrap();

        match InMemoryAuditLog::open(&path) {
            Err(GatewayError::StorageUnavailable { reason }) => {
                assert!(reason.contains("integrity"), "got: {reason}")
            }
            other => panic!("expected StorageUnavailable, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_corrupt_journal_line_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "{{not json").unwrap();

        assert!(matches!(
            InMemoryAuditLog::open(&path),
            Err(GatewayError::StorageUnavailable { .. })
        ));
    }

    fn set_fail_after(log: &InMemoryAuditLog, bytes: usize) {
        let mut state = log.state.lock().unwrap();
        state.journal.as_mut().unwrap().fail_after = Some(bytes);
    }

    #[test]
    fn test_torn_append_is_rolled_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let user = UserId::new();

        let log = InMemoryAuditLog::open(&path).unwrap();
        log.record(&make_event(user, "first")).unwrap();
        let length = fs::metadata(&path).unwrap().len();

        set_fail_after(&log, 17);
        assert!(matches!(
            log.record(&make_event(user, "torn")),
            Err(GatewayError::StorageUnavailable { .. })
        ));
        assert_eq!(fs::metadata(&path).unwrap().len(), length);
        assert_eq!(log.len().unwrap(), 1);

        log.record(&make_event(user, "second")).unwrap();
        assert_eq!(log.entries().unwrap()[1].sequence, 1);
        drop(log);

        let reopened = InMemoryAuditLog::open(&path).unwrap();
        assert!(reopened.verify_integrity().unwrap());
        let history = reopened.query(HistoryScope::User(user), None).unwrap();
        assert_eq!(texts(&history), vec!["second", "first"]);
    }

    #[test]
    fn test_written_but_unsynced_append_is_rolled_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let user = UserId::new();

        let log = InMemoryAuditLog::open(&path).unwrap();
        log.record(&make_event(user, "first")).unwrap();
        let length = fs::metadata(&path).unwrap().len();

        // The whole line reaches the file, then the flush reports failure.
        set_fail_after(&log, usize::MAX);
        assert!(log.record(&make_event(user, "unsynced")).is_err());
        assert_eq!(fs::metadata(&path).unwrap().len(), length);

        log.record(&make_event(user, "second")).unwrap();
        drop(log);

        let reopened = InMemoryAuditLog::open(&path).unwrap();
        assert_eq!(reopened.len().unwrap(), 2);
        let history = reopened.query(HistoryScope::All, None).unwrap();
        assert_eq!(texts(&history), vec!["second", "first"]);
    }

    #[test]
    fn test_journal_refuses_appends_after_failed_rollback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let user = UserId::new();

        let log = InMemoryAuditLog::open(&path).unwrap();
        log.record(&make_event(user, "first")).unwrap();
        log.record(&make_event(user, "second")).unwrap();

        // A read-only handle fails both the write and the truncate.
        {
            let mut state = log.state.lock().unwrap();
            state.journal.as_mut().unwrap().file = fs::File::open(&path).unwrap();
        }

        assert!(log.record(&make_event(user, "third")).is_err());
        match log.record(&make_event(user, "fourth")) {
            Err(GatewayError::StorageUnavailable { reason }) => {
                assert!(reason.contains("failed rollback"), "got: {reason}")
            }
            other => panic!("expected StorageUnavailable, got {:?}", other),
        }
        assert_eq!(log.len().unwrap(), 2);
        drop(log);

        let reopened = InMemoryAuditLog::open(&path).unwrap();
        assert_eq!(reopened.len().unwrap(), 2);
        assert!(reopened.verify_integrity().unwrap());
    }
}
