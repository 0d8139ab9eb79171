//! UID firewall map layouts and rule bit positions.

// ── Rule bits (uid_owner.rule, configuration UID_RULES slot) ────────

pub const HAPPY_BOX_MATCH: u32 = 1 << 0;
pub const PENALTY_BOX_USER_MATCH: u32 = 1 << 1;
pub const DOZABLE_MATCH: u32 = 1 << 2;
pub const STANDBY_MATCH: u32 = 1 << 3;
pub const POWERSAVE_MATCH: u32 = 1 << 4;
pub const RESTRICTED_MATCH: u32 = 1 << 5;
pub const LOW_POWER_STANDBY_MATCH: u32 = 1 << 6;
pub const IIF_MATCH: u32 = 1 << 7;
pub const LOCKDOWN_VPN_MATCH: u32 = 1 << 8;
pub const OEM_DENY_1_MATCH: u32 = 1 << 9;
pub const OEM_DENY_2_MATCH: u32 = 1 << 10;
pub const OEM_DENY_3_MATCH: u32 = 1 << 11;
pub const BACKGROUND_MATCH: u32 = 1 << 12;
pub const PENALTY_BOX_ADMIN_MATCH: u32 = 1 << 13;

/// Rule classes that drop a UID carrying the bit.
pub const DROP_IF_SET: u32 = STANDBY_MATCH
    | OEM_DENY_1_MATCH
    | OEM_DENY_2_MATCH
    | OEM_DENY_3_MATCH
    | PENALTY_BOX_USER_MATCH
    | PENALTY_BOX_ADMIN_MATCH;

/// Rule classes that drop a UID lacking the bit.
pub const DROP_IF_UNSET: u32 = DOZABLE_MATCH
    | POWERSAVE_MATCH
    | RESTRICTED_MATCH
    | LOW_POWER_STANDBY_MATCH
    | BACKGROUND_MATCH;

// ── UID owner value: 8 bytes ───────────────────────────────────────

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UidOwnerValue {
    /// Allowed ingress interface, 0 = any.
    pub iif: u32,
    pub rule: u32,
}

// ── Ingress discard: 16-byte key, 8-byte value ─────────────────────

/// Destination address, IPv4 stored v4-mapped (`::ffff:a.b.c.d`).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct IngressDiscardKey {
    pub daddr: [u8; 16],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IngressDiscardValue {
    pub iif: [u32; 2],
}

// ── Local network access LPM key: 28 bytes ─────────────────────────

/// Bits of `LocalNetAccessKey` after `prefixlen` that participate in the
/// match: if_index(32) + remote_ip6(128) + protocol(16) + remote_port(16).
pub const LOCAL_NET_ACCESS_FULL_PREFIX: u32 = 32 + 128 + 16 + 16;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LocalNetAccessKey {
    pub prefixlen: u32,
    pub if_index: u32,
    pub remote_ip6: [u8; 16],
    pub protocol: u16,
    /// 0 for protocols without ports.
    pub remote_port: u16,
}
