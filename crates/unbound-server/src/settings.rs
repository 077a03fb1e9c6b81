//! Server settings file.
//!
//! ```toml
//! bind = "0.0.0.0:8001"
//! bootstrap_admin = "root"
//!
//! [gateway]
//! no_match = "block"
//! risk_block_threshold = 100
//!
//! [audit]
//! journal_path = "var/audit.jsonl"
//!
//! [[rules]]
//! pattern = "rm -rf"
//! action = "AUTO_REJECT"
//! ```
//!
//! Every key is optional.

use std::{
    net::{Ipv4Addr, SocketAddr},
    path::{Path, PathBuf},
};

use serde::Deserialize;

use unbound_contracts::{
    error::{GatewayError, GatewayResult},
    rule::NewRule,
};
use unbound_core::GatewayConfig;

pub const DEFAULT_PORT: u16 = 8001;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuditSettings {
    /// JSON-lines journal. When unset the audit log lives only in memory.
    pub journal_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub bind: SocketAddr,

    /// Name of an admin to create when the identity store starts empty.
    pub bootstrap_admin: Option<String>,

    pub gateway: GatewayConfig,
    pub audit: AuditSettings,

    /// Rules created at startup, in priority order.
    pub rules: Vec<NewRule>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
            bootstrap_admin: None,
            gateway: GatewayConfig::default(),
            audit: AuditSettings::default(),
            rules: Vec::new(),
        }
    }
}

impl Settings {
    /// Parse `s` as a TOML settings file and validate it.
    pub fn from_toml_str(s: &str) -> GatewayResult<Self> {
        let settings: Settings = toml::from_str(s).map_err(|e| GatewayError::Config {
            reason: format!("failed to parse settings TOML: {}", e),
        })?;
        settings.gateway.validate()?;
        Ok(settings)
    }

    /// Read and parse the settings file at `path`.
    pub fn from_file(path: &Path) -> GatewayResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| GatewayError::Config {
            reason: format!("failed to read settings file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            GatewayError::Config { reason } => GatewayError::Config {
                reason: format!("{}: {}", path.display(), reason),
            },
            other => other,
        })
    }
}
