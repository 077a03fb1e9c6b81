//! Gateway policy configuration.
//!
//! Deserialized from the `[gateway]` table of the server settings file, or
//! built in code for tests and the demo. Every field has a default.

use serde::{Deserialize, Serialize};

use unbound_contracts::error::{GatewayError, GatewayResult};

/// What to do with a command that matches no active rule.
///
/// ```toml
/// no_match = "report"   # status NO_MATCH, not charged (default)
/// no_match = "block"    # status BLOCKED by default policy
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoMatchPolicy {
    #[default]
    Report,
    Block,
}

/// Tunables for the command state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GatewayConfig {
    pub no_match: NoMatchPolicy,

    /// Block unmatched commands whose risk score is at least this value.
    /// Rule matches always take precedence over the heuristic.
    pub risk_block_threshold: Option<u32>,

    /// Credits debited per executed command.
    pub command_cost: u64,

    /// Balance given to newly created users.
    pub starting_credits: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            no_match: NoMatchPolicy::Report,
            risk_block_threshold: None,
            command_cost: 1,
            starting_credits: 10,
        }
    }
}

impl GatewayConfig {
    /// Parse `s` as a TOML `GatewayConfig` table and validate it.
    pub fn from_toml_str(s: &str) -> GatewayResult<Self> {
        let config: GatewayConfig = toml::from_str(s).map_err(|e| GatewayError::Config {
            reason: format!("failed to parse gateway TOML: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> GatewayResult<()> {
        if self.command_cost == 0 {
            return Err(GatewayError::Config {
                reason: "command_cost must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_table_yields_defaults() {
        let config = GatewayConfig::from_toml_str("").unwrap();
        assert_eq!(config, GatewayConfig::default());
        assert_eq!(config.no_match, NoMatchPolicy::Report);
        assert_eq!(config.command_cost, 1);
        assert_eq!(config.starting_credits, 10);
    }

    #[test]
    fn parses_block_posture_and_threshold() {
        let config = GatewayConfig::from_toml_str(
            r#"
            no_match = "block"
            risk_block_threshold = 100
            starting_credits = 25
            "#,
        )
        .unwrap();
        assert_eq!(config.no_match, NoMatchPolicy::Block);
        assert_eq!(config.risk_block_threshold, Some(100));
        assert_eq!(config.starting_credits, 25);
    }

    #[test]
    fn zero_cost_is_rejected() {
        match GatewayConfig::from_toml_str("command_cost = 0") {
            Err(GatewayError::Config { reason }) => assert!(reason.contains("command_cost")),
            other => panic!("expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn unknown_keys_are_rejected() {
        match GatewayConfig::from_toml_str("no_match = \"report\"\nfail_open = true") {
            Err(GatewayError::Config { reason }) => {
                assert!(reason.contains("failed to parse gateway TOML"), "got: {reason}")
            }
            other => panic!("expected Config error, got {:?}", other),
        }
    }
}
