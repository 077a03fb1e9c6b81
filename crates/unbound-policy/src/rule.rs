//! Compiled rules and the TOML seed schema.
//!
//! A `CompiledRule` pairs a stored `Rule` with its compiled `Regex`. The
//! store only ever holds compiled rules, so a rule whose pattern does not
//! compile cannot exist.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use unbound_contracts::{
    error::{GatewayError, GatewayResult},
    rule::{NewRule, Rule},
    verdict::RuleMatch,
};

/// Upper bound on the compiled size of a single rule pattern.
const PATTERN_SIZE_LIMIT: usize = 1 << 20;

/// Compile `pattern` or explain why it cannot be a rule.
///
/// The error echoes the pattern so an operator can correct it.
pub fn compile_pattern(pattern: &str) -> GatewayResult<Regex> {
    if pattern.trim().is_empty() {
        return Err(GatewayError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: "pattern must not be empty".to_string(),
        });
    }

    RegexBuilder::new(pattern)
        .size_limit(PATTERN_SIZE_LIMIT)
        .build()
        .map_err(|e| GatewayError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })
}

/// A stored rule together with its compiled pattern.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub rule: Rule,
    regex: Regex,
}

impl CompiledRule {
    pub(crate) fn new(rule: Rule, regex: Regex) -> Self {
        Self { rule, regex }
    }

    pub(crate) fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Unanchored search: true if the pattern occurs anywhere in `command`.
    ///
    /// Inactive rules never match.
    pub fn matches(&self, command: &str) -> bool {
        self.rule.is_active && self.regex.is_match(command)
    }

    /// Snapshot of this rule's identity for the verdict and audit entry.
    pub fn to_match(&self) -> RuleMatch {
        RuleMatch {
            rule_id: self.rule.id,
            pattern: self.rule.pattern.clone(),
            action: self.rule.action,
        }
    }
}

/// Rules loaded at startup, in the order they should be created.
///
/// Example:
/// ```toml
/// [[rules]]
/// pattern = "rm -rf"
/// action = "AUTO_REJECT"
/// description = "Never allow recursive forced deletes"
///
/// [[rules]]
/// pattern = "^git (pull|fetch|status)"
/// action = "AUTO_ACCEPT"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleSeeds {
    #[serde(default)]
    pub rules: Vec<NewRule>,
}

impl RuleSeeds {
    /// Parse `s` as TOML seed rules.
    ///
    /// Returns `GatewayError::Config` if the TOML is malformed. Patterns are
    /// not compiled here; the store does that on insert.
    pub fn from_toml_str(s: &str) -> GatewayResult<Self> {
        toml::from_str(s).map_err(|e| GatewayError::Config {
            reason: format!("failed to parse rule TOML: {}", e),
        })
    }
}
