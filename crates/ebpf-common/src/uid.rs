//! Android identity constants and helpers shared by every hook.

/// Per-user UID range width.
pub const AID_USER_OFFSET: u32 = 100_000;

pub const AID_ROOT: u32 = 0;
pub const AID_SYSTEM: u32 = 1000;
/// Identity of the clat daemon. Its egress is accounted on the v4 interface.
pub const AID_CLAT: u32 = 1029;
/// Identity of the DNS resolver.
pub const AID_DNS: u32 = 1051;
/// First application id; everything below is a system identity.
pub const AID_APP_START: u32 = 10_000;

/// Kernel overflow UID reported for sockets without a mapped owner.
pub const OVERFLOW_UID: u32 = 65_534;

/// Tag applied by the resolver to its own DNS queries.
pub const TAG_SYSTEM_DNS: u32 = 0xFFFF_FF82;

// ── Permission bits (uid_permission map) ────────────────────────────

pub const PERMISSION_NONE: u8 = 0;
pub const PERMISSION_INTERNET: u8 = 1 << 2;
pub const PERMISSION_UPDATE_DEVICE_STATS: u8 = 1 << 3;

/// Application id of `uid` with the user component stripped.
#[inline]
pub const fn app_id(uid: u32) -> u32 {
    uid % AID_USER_OFFSET
}

#[inline]
pub const fn is_system_uid(uid: u32) -> bool {
    app_id(uid) < AID_APP_START
}
