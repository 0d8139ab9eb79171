use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use ebpf_common::firewall::{
    self as fw, IngressDiscardValue, LOCAL_NET_ACCESS_FULL_PREFIX, LocalNetAccessKey,
    UidOwnerValue,
};

use super::error::FirewallError;

// ── Rule classes ────────────────────────────────────────────────────

bitflags! {
    /// Independent firewall rule classes, both as per-UID membership and as
    /// the globally enabled set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct UidRules: u32 {
        const HAPPY_BOX = fw::HAPPY_BOX_MATCH;
        const PENALTY_BOX_USER = fw::PENALTY_BOX_USER_MATCH;
        const DOZABLE = fw::DOZABLE_MATCH;
        const STANDBY = fw::STANDBY_MATCH;
        const POWERSAVE = fw::POWERSAVE_MATCH;
        const RESTRICTED = fw::RESTRICTED_MATCH;
        const LOW_POWER_STANDBY = fw::LOW_POWER_STANDBY_MATCH;
        const IIF_MATCH = fw::IIF_MATCH;
        const LOCKDOWN_VPN = fw::LOCKDOWN_VPN_MATCH;
        const OEM_DENY_1 = fw::OEM_DENY_1_MATCH;
        const OEM_DENY_2 = fw::OEM_DENY_2_MATCH;
        const OEM_DENY_3 = fw::OEM_DENY_3_MATCH;
        const BACKGROUND = fw::BACKGROUND_MATCH;
        const PENALTY_BOX_ADMIN = fw::PENALTY_BOX_ADMIN_MATCH;
    }
}

impl UidRules {
    /// Denylist classes: a UID holding the bit is dropped while the class is enabled.
    pub const DROP_IF_SET: Self = Self::STANDBY
        .union(Self::OEM_DENY_1)
        .union(Self::OEM_DENY_2)
        .union(Self::OEM_DENY_3)
        .union(Self::PENALTY_BOX_USER)
        .union(Self::PENALTY_BOX_ADMIN);

    /// Allowlist classes: a UID lacking the bit is dropped while the class is enabled.
    pub const DROP_IF_UNSET: Self = Self::DOZABLE
        .union(Self::POWERSAVE)
        .union(Self::RESTRICTED)
        .union(Self::LOW_POWER_STANDBY)
        .union(Self::BACKGROUND);
}

// ── Verdict ─────────────────────────────────────────────────────────

/// Outcome of owner matching before the DNS carve-out is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Drop,
    DropUnlessDns,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Drop => "drop",
            Self::DropUnlessDns => "drop_unless_dns",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Per-UID state ───────────────────────────────────────────────────

/// Firewall state for one UID (uid_owner map).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UidOwnerEntry {
    pub rules: UidRules,
    /// Allowed ingress interface; 0 = no restriction.
    #[serde(default)]
    pub allowed_iif: u32,
}

impl UidOwnerEntry {
    pub fn to_value(self) -> UidOwnerValue {
        UidOwnerValue {
            iif: self.allowed_iif,
            rule: self.rules.bits(),
        }
    }
}

impl From<UidOwnerValue> for UidOwnerEntry {
    fn from(v: UidOwnerValue) -> Self {
        Self {
            rules: UidRules::from_bits_truncate(v.rule),
            allowed_iif: v.iif,
        }
    }
}

/// Interfaces a destination address may be reached through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressDiscardEntry {
    pub allowed_iif: [u32; 2],
}

impl IngressDiscardEntry {
    pub fn permits(&self, ifindex: u32) -> bool {
        self.allowed_iif.contains(&ifindex)
    }
}

impl From<IngressDiscardValue> for IngressDiscardEntry {
    fn from(v: IngressDiscardValue) -> Self {
        Self { allowed_iif: v.iif }
    }
}

impl From<IngressDiscardEntry> for IngressDiscardValue {
    fn from(e: IngressDiscardEntry) -> Self {
        Self { iif: e.allowed_iif }
    }
}

/// Policy tables read for one owner-match evaluation.
///
/// Each field is one independent map read; they are not a consistent
/// snapshot of each other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OwnerPolicy {
    pub enabled: UidRules,
    pub owner: Option<UidOwnerEntry>,
    pub ingress_discard: Option<IngressDiscardEntry>,
}

// ── Local network access ────────────────────────────────────────────

/// Exact tuple looked up in the local-network LPM table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocalNetQuery {
    pub if_index: u32,
    pub remote_ip6: [u8; 16],
    pub protocol: u16,
    pub remote_port: u16,
}

impl LocalNetQuery {
    pub fn to_key(self) -> LocalNetAccessKey {
        LocalNetAccessKey {
            prefixlen: LOCAL_NET_ACCESS_FULL_PREFIX,
            if_index: self.if_index,
            remote_ip6: self.remote_ip6,
            protocol: self.protocol,
            remote_port: self.remote_port,
        }
    }
}

/// One configured local-network entry. Fields narrow the match left to
/// right: interface, address prefix, protocol, port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalNetRule {
    pub if_index: u32,
    pub remote: [u8; 16],
    pub remote_prefix_len: u8,
    #[serde(default)]
    pub protocol: Option<u16>,
    #[serde(default)]
    pub remote_port: Option<u16>,
    pub allowed: bool,
}

impl LocalNetRule {
    pub fn validate(&self) -> Result<(), FirewallError> {
        if self.remote_prefix_len > 128 {
            return Err(FirewallError::InvalidPrefix {
                prefix_len: self.remote_prefix_len,
            });
        }
        if self.protocol.is_some() && self.remote_prefix_len != 128 {
            return Err(FirewallError::PartialLocalNetKey {
                reason: "protocol requires a full /128 address",
            });
        }
        if self.remote_port.is_some() && self.protocol.is_none() {
            return Err(FirewallError::PartialLocalNetKey {
                reason: "port requires a protocol",
            });
        }
        Ok(())
    }

    /// LPM key with the address masked to its prefix.
    pub fn to_key(&self) -> Result<LocalNetAccessKey, FirewallError> {
        self.validate()?;
        let mut prefixlen = 32 + u32::from(self.remote_prefix_len);
        if self.protocol.is_some() {
            prefixlen += 16;
        }
        if self.remote_port.is_some() {
            prefixlen += 16;
        }
        Ok(LocalNetAccessKey {
            prefixlen,
            if_index: self.if_index,
            remote_ip6: mask_v6(self.remote, self.remote_prefix_len),
            protocol: self.protocol.unwrap_or(0),
            remote_port: self.remote_port.unwrap_or(0),
        })
    }
}

fn mask_v6(addr: [u8; 16], prefix_len: u8) -> [u8; 16] {
    let bits = u128::from_be_bytes(addr);
    let mask = match prefix_len {
        0 => 0,
        n => u128::MAX << (128 - u32::from(n.min(128))),
    };
    (bits & mask).to_be_bytes()
}
