//! Agent configuration: structs, parsing, and validation.
//!
//! - `common`: `ConfigError` and address parsing helpers
//! - `policy`: firewall and accounting tables
//! - `clat`: 464XLAT sessions

mod clat;
mod common;
mod policy;

pub use clat::{ClatConfig, ClatSessionConfig};
pub use common::{ConfigError, Prefix6, parse_addr6, parse_cidr};
pub use policy::{
    CounterSetConfig, IngressDiscardConfig, LocalNetRuleConfig, LocalNetworkConfig,
    PermissionConfig, PolicyConfig, UidRuleConfig,
};

use std::path::Path;

use domain::common::entity::{CounterGeneration, Environment};
use domain::tagging::entity::TagQuota;
use ebpf_common::config::{
    PER_UID_STATS_ENTRIES_LIMIT, STATS_MAP_SIZE, TOTAL_UID_STATS_ENTRIES_LIMIT,
};
use serde::{Deserialize, Serialize};

use common::warn_if_world_readable;

// ── Top-level config ───────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    #[serde(default)]
    pub agent: AgentInfo,

    /// Kernel and platform release the hooks emulate.
    #[serde(default)]
    pub environment: Environment,

    #[serde(default)]
    pub accounting: AccountingConfig,

    #[serde(default)]
    pub policy: PolicyConfig,

    #[serde(default)]
    pub clat: ClatConfig,
}

impl AgentConfig {
    /// Load config from a YAML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        warn_if_world_readable(path, "config file");
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the config after deserialization.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.accounting.validate()?;
        self.policy.validate()?;
        self.clat.validate()?;
        Ok(())
    }
}

// ── Agent section ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentInfo {
    #[serde(default = "default_log_level")]
    pub log_level: LogLevel,

    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,
}

impl Default for AgentInfo {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

fn default_log_format() -> LogFormat {
    LogFormat::Json
}

// ── Accounting section ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccountingConfig {
    /// Stats entries a single UID may hold before tagging is refused.
    #[serde(default = "default_per_uid_limit")]
    pub per_uid_tag_limit: u32,

    /// Stats entries in total before tagging is refused.
    #[serde(default = "default_total_limit")]
    pub total_tag_limit: u32,

    #[serde(default = "default_generation")]
    pub active_generation: CounterGeneration,

    #[serde(default)]
    pub packet_trace: bool,
}

impl Default for AccountingConfig {
    fn default() -> Self {
        Self {
            per_uid_tag_limit: default_per_uid_limit(),
            total_tag_limit: default_total_limit(),
            active_generation: default_generation(),
            packet_trace: false,
        }
    }
}

fn default_per_uid_limit() -> u32 {
    PER_UID_STATS_ENTRIES_LIMIT
}

fn default_total_limit() -> u32 {
    TOTAL_UID_STATS_ENTRIES_LIMIT
}

fn default_generation() -> CounterGeneration {
    CounterGeneration::A
}

impl AccountingConfig {
    pub fn tag_quota(&self) -> TagQuota {
        TagQuota {
            per_uid_limit: self.per_uid_tag_limit,
            total_limit: self.total_tag_limit,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tag_quota()
            .validate(STATS_MAP_SIZE)
            .map_err(|e| ConfigError::Validation {
                field: "accounting.total_tag_limit".to_string(),
                message: e.to_string(),
            })
    }
}

// ── Log level ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(format!(
                "invalid log level '{s}': expected error|warn|info|debug|trace"
            )),
        }
    }
}

// ── Log format ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Json,
    Text,
}

impl LogFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Text => "text",
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" | "pretty" => Ok(Self::Text),
            _ => Err(format!("invalid log format '{s}': expected json|text")),
        }
    }
}
