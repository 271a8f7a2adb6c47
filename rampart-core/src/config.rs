//! # Audit configuration — loads and validates TOML configuration
//!
//! Reads `rampart.toml` (or a custom path) into typed config structs. The
//! watched-port and replacement-CIDR defaults live here and are passed into
//! classification and planning explicitly, keeping those functions pure.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, RampartResult};

/// Ports that flag a group when opened to the world.
pub const DEFAULT_WATCHED_PORTS: &[u16] = &[22, 3389, 1433, 3306, 5432, 6379, 27017, 9200, 5601];

/// RFC 1918 private ranges — the default substitutes for a revoked
/// world-open rule.
pub const DEFAULT_REPLACEMENT_CIDRS: &[&str] = &["10.0.0.0/8", "172.16.0.0/12", "192.168.0.0/16"];

/// Top-level rampart configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub audit: AuditSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditSection {
    pub watched_ports: Vec<u16>,
    pub replacement_cidrs: Vec<String>,
}

impl Default for AuditSection {
    fn default() -> Self {
        Self {
            watched_ports: DEFAULT_WATCHED_PORTS.to_vec(),
            replacement_cidrs: DEFAULT_REPLACEMENT_CIDRS
                .iter()
                .map(|c| c.to_string())
                .collect(),
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            audit: AuditSection::default(),
        }
    }
}

impl AuditConfig {
    pub fn load(path: impl AsRef<Path>) -> RampartResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        toml::from_str(&text).map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> RampartResult<()> {
        let text = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("cannot serialize config: {e}")))?;
        std::fs::write(path.as_ref(), text)?;
        Ok(())
    }

    pub fn watched_set(&self) -> BTreeSet<u16> {
        self.audit.watched_ports.iter().copied().collect()
    }
}
