//! Destructive-command risk heuristic.
//!
//! A fixed catalogue of signals, each a regex with a weight. The score of a
//! command is the saturating sum of the weights of every signal found in it;
//! a command with no signal scores 0. Catastrophic, irreversible operations
//! weigh 100 so that a single one reaches the usual block threshold.
//!
//! The score never decides a verdict by itself: it is recorded on every
//! audit entry and only blocks when the gateway is configured with a
//! threshold and no rule matched.

use std::sync::LazyLock;

use regex::Regex;

/// One entry in the signal catalogue.
pub struct RiskSignal {
    pub id: &'static str,
    pub weight: u32,
    pub reason: &'static str,
    regex: Regex,
}

/// (id, weight, pattern, reason)
const CATALOGUE: &[(&str, u32, &str, &str)] = &[
    (
        "fs.delete-root",
        100,
        r"(?i)\brm\s+(-\S+\s+)+(/|/\*|~|~/|\$HOME)(\s|$)",
        "rm with flags targeting the filesystem root or home directory",
    ),
    (
        "fs.recursive-force-delete",
        60,
        r"(?i)\brm\s+(-\S+\s+)*-([a-z]*r[a-z]*f|[a-z]*f[a-z]*r)[a-z]*(\s|$)",
        "recursive forced deletion",
    ),
    (
        "fs.make-filesystem",
        100,
        r"\b(mkfs(\.\w+)?|mke2fs)\b",
        "filesystem creation destroys existing data",
    ),
    (
        "fs.raw-device-write",
        100,
        r"(\bof=|>\s*)/dev/(sd[a-z]|nvme\d|hd[a-z]|xvd[a-z]|vd[a-z]|disk\d)",
        "writing directly to a block device",
    ),
    (
        "fs.world-writable",
        40,
        r"\bchmod\s+(-\S+\s+)*(0?777|a\+rwx)(\s|$)",
        "world-writable permissions",
    ),
    (
        "git.force-push",
        50,
        r"\bgit\s+push\b.*\s(--force|-f)(\s|$)",
        "force push rewrites remote history",
    ),
    (
        "git.hard-reset",
        40,
        r"\bgit\s+reset\s+--hard\b",
        "hard reset discards local changes",
    ),
    (
        "git.force-clean",
        30,
        r"\bgit\s+clean\s+(-\S+\s+)*-[a-z]*f",
        "force clean deletes untracked files",
    ),
    (
        "net.pipe-to-shell",
        70,
        r"\b(curl|wget)\b[^|]*\|\s*(sudo\s+)?(ba|z|da|k)?sh\b",
        "downloaded content piped into a shell",
    ),
    (
        "proc.fork-bomb",
        100,
        r":\(\)\s*\{\s*:\s*\|\s*:\s*&\s*\}\s*;\s*:",
        "fork bomb",
    ),
    (
        "sys.power-state",
        50,
        r"\b(shutdown|reboot|halt|poweroff)\b",
        "changes machine power state",
    ),
    (
        "db.drop",
        60,
        r"(?i)\bdrop\s+(table|database|schema)\b",
        "drops database objects",
    ),
    (
        "priv.sudo",
        20,
        r"\bsudo\b",
        "privilege escalation",
    ),
];

static SIGNALS: LazyLock<Vec<RiskSignal>> = LazyLock::new(|| {
    CATALOGUE
        .iter()
        .map(|&(id, weight, pattern, reason)| RiskSignal {
            id,
            weight,
            reason,
            regex: Regex::new(pattern).expect("built-in risk pattern must compile"),
        })
        .collect()
});

/// The score of one command and the signals that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskAssessment {
    pub score: u32,
    pub signals: Vec<&'static str>,
}

/// Every signal in the catalogue.
pub fn signals() -> &'static [RiskSignal] {
    &SIGNALS
}

/// Score `command` and list the signals found in it.
pub fn assess(command: &str) -> RiskAssessment {
    let mut score = 0u32;
    let mut fired = Vec::new();
    for signal in SIGNALS.iter() {
        if signal.regex.is_match(command) {
            score = score.saturating_add(signal.weight);
            fired.push(signal.id);
        }
    }
    RiskAssessment { score, signals: fired }
}

pub fn score(command: &str) -> u32 {
    assess(command).score
}
