use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::atomic::{AtomicU64, Ordering};

use ebpf_common::clat::{ClatEgress4Key, ClatEgress4Value, ClatIngress6Key, ClatIngress6Value};
use serde::{Deserialize, Serialize};

use super::error::ClatError;

/// Link framing of the interface a clat program is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    Ethernet,
    RawIp,
}

/// IPv6 → IPv4 mapping for traffic arriving on the IPv6 uplink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClatIngressSession {
    pub iif: u32,
    pub pfx96: Ipv6Addr,
    pub local6: Ipv6Addr,
    pub local4: Ipv4Addr,
    /// 0 = let the translated frame continue on the same interface.
    pub oif: u32,
}

impl ClatIngressSession {
    pub fn validate(&self) -> Result<(), ClatError> {
        validate_prefix(self.pfx96)?;
        if self.local6.is_unspecified() {
            return Err(ClatError::UnspecifiedAddress { field: "local6" });
        }
        if self.local4.is_unspecified() {
            return Err(ClatError::UnspecifiedAddress { field: "local4" });
        }
        Ok(())
    }

    pub fn key(&self) -> ClatIngress6Key {
        ClatIngress6Key {
            iif: self.iif,
            pfx96: self.pfx96.octets(),
            local6: self.local6.octets(),
        }
    }

    pub fn value(&self) -> ClatIngress6Value {
        ClatIngress6Value {
            oif: self.oif,
            local4: self.local4.octets(),
            packets: 0,
            bytes: 0,
        }
    }
}

/// IPv4 → IPv6 mapping for traffic leaving through the stacked v4 interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClatEgressSession {
    pub iif: u32,
    pub local4: Ipv4Addr,
    pub local6: Ipv6Addr,
    pub pfx96: Ipv6Addr,
    pub oif: u32,
    #[serde(default)]
    pub oif_is_ethernet: bool,
}

impl ClatEgressSession {
    pub fn validate(&self) -> Result<(), ClatError> {
        validate_prefix(self.pfx96)?;
        if self.local6.is_unspecified() {
            return Err(ClatError::UnspecifiedAddress { field: "local6" });
        }
        if self.local4.is_unspecified() {
            return Err(ClatError::UnspecifiedAddress { field: "local4" });
        }
        if self.oif == 0 {
            return Err(ClatError::MissingOutputInterface {
                local4: self.local4.to_string(),
            });
        }
        Ok(())
    }

    pub fn key(&self) -> ClatEgress4Key {
        ClatEgress4Key {
            iif: self.iif,
            local4: self.local4.octets(),
        }
    }

    pub fn value(&self) -> ClatEgress4Value {
        ClatEgress4Value {
            local6: self.local6.octets(),
            pfx96: self.pfx96.octets(),
            oif: self.oif,
            oif_is_ethernet: u8::from(self.oif_is_ethernet),
            _pad: [0; 3],
            packets: 0,
            bytes: 0,
        }
    }
}

fn validate_prefix(pfx96: Ipv6Addr) -> Result<(), ClatError> {
    if pfx96.octets()[12..] != [0, 0, 0, 0] {
        return Err(ClatError::PrefixNotSlash96);
    }
    Ok(())
}

/// Translated packet/byte counters of one session.
#[derive(Debug, Default)]
pub struct SessionCounters {
    packets: AtomicU64,
    bytes: AtomicU64,
}

impl SessionCounters {
    pub fn record(&self, bytes: u64) {
        self.packets.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    /// `(packets, bytes)`
    pub fn snapshot(&self) -> (u64, u64) {
        (
            self.packets.load(Ordering::Relaxed),
            self.bytes.load(Ordering::Relaxed),
        )
    }
}

/// Result of rewriting one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslateOutcome {
    /// Frame left untouched.
    Untouched,
    /// Frame left untouched and marked for the userspace daemon.
    Marked,
    /// Frame rewritten; `bytes` is the new length past the link header.
    Translated { bytes: u64 },
}
