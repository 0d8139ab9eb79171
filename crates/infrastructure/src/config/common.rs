//! Shared parsing helpers and the config error type.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::path::Path;

use tracing::warn;

// ── Config errors ──────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error reading config: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(String),

    #[error("validation error: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("invalid CIDR notation '{value}': {reason}")]
    InvalidCidr { value: String, reason: String },

    #[error("invalid value '{value}' for field '{field}': expected one of {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },
}

impl From<serde_yaml_ng::Error> for ConfigError {
    fn from(e: serde_yaml_ng::Error) -> Self {
        Self::Yaml(e.to_string())
    }
}

impl ConfigError {
    pub(super) fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

// ── Parsing helpers ────────────────────────────────────────────────

/// An address prefix in the 128-bit space the maps key on. IPv4 input is
/// stored v4-mapped (`::ffff:a.b.c.d`) with its prefix length shifted by 96.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prefix6 {
    pub addr: [u8; 16],
    pub prefix_len: u8,
}

/// Parse `"192.168.1.0/24"`, `"fe80::/10"` or a bare address.
pub fn parse_cidr(s: &str) -> Result<Prefix6, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidCidr {
        value: s.to_string(),
        reason: reason.to_string(),
    };
    let (addr_part, len_part) = match s.split_once('/') {
        Some((a, l)) => (a, Some(l)),
        None => (s, None),
    };
    let addr: IpAddr = addr_part
        .trim()
        .parse()
        .map_err(|_| invalid("invalid address"))?;
    let max = if addr.is_ipv4() { 32 } else { 128 };
    let prefix_len = match len_part {
        Some(l) => l
            .trim()
            .parse::<u8>()
            .map_err(|_| invalid("invalid prefix length"))?,
        None => max,
    };
    if prefix_len > max {
        return Err(invalid(&format!("prefix length exceeds {max}")));
    }
    Ok(match addr {
        IpAddr::V4(v4) => Prefix6 {
            addr: v4.to_ipv6_mapped().octets(),
            prefix_len: prefix_len + 96,
        },
        IpAddr::V6(v6) => Prefix6 {
            addr: v6.octets(),
            prefix_len,
        },
    })
}

/// Parse a single IPv4 or IPv6 address into its 128-bit map form.
pub fn parse_addr6(s: &str) -> Result<[u8; 16], ConfigError> {
    match s.trim().parse::<IpAddr>() {
        Ok(IpAddr::V4(v4)) => Ok(v4.to_ipv6_mapped().octets()),
        Ok(IpAddr::V6(v6)) => Ok(v6.octets()),
        Err(_) => Err(ConfigError::InvalidCidr {
            value: s.to_string(),
            reason: "invalid address".to_string(),
        }),
    }
}

pub(super) fn parse_ipv4(field: &str, s: &str) -> Result<Ipv4Addr, ConfigError> {
    s.trim().parse().map_err(|_| ConfigError::InvalidValue {
        field: field.to_string(),
        value: s.to_string(),
        expected: "an IPv4 address".to_string(),
    })
}

pub(super) fn parse_ipv6(field: &str, s: &str) -> Result<Ipv6Addr, ConfigError> {
    s.trim().parse().map_err(|_| ConfigError::InvalidValue {
        field: field.to_string(),
        value: s.to_string(),
        expected: "an IPv6 address".to_string(),
    })
}

/// Log a warning if a file is world-readable (Unix only).
#[cfg(unix)]
pub(super) fn warn_if_world_readable(path: &Path, label: &str) {
    use std::os::unix::fs::PermissionsExt;
    if let Ok(metadata) = std::fs::metadata(path) {
        let mode = metadata.permissions().mode();
        if mode & 0o004 != 0 {
            warn!(
                path = %path.display(),
                mode = format!("{mode:04o}"),
                "{label} is world-readable, consider chmod 640 or stricter",
            );
        }
    }
}

#[cfg(not(unix))]
pub(super) fn warn_if_world_readable(_path: &Path, _label: &str) {}

/// Enforce a maximum entry count against a map capacity.
pub(super) fn check_limit(field: &str, count: usize, max: u32) -> Result<(), ConfigError> {
    if count > max as usize {
        return Err(ConfigError::validation(
            field,
            format!("count {count} exceeds map capacity {max}"),
        ));
    }
    Ok(())
}
