//! Configuration array slots and map capacities.

// ── Configuration slots ─────────────────────────────────────────────

/// Slot holding the enabled `UidRules` classes.
pub const UID_RULES_CONFIGURATION_KEY: u32 = 0;
/// Slot holding the active counter generation.
pub const CURRENT_STATS_MAP_CONFIGURATION_KEY: u32 = 1;
pub const CONFIGURATION_MAP_SIZE: u32 = 2;

/// Generation selector values stored in `CURRENT_STATS_MAP_CONFIGURATION_KEY`.
pub const SELECT_MAP_A: u32 = 0;
pub const SELECT_MAP_B: u32 = 1;

/// All-disabled value returned for absent slots.
pub const DEFAULT_CONFIG: u32 = 0;

// ── Map capacities ──────────────────────────────────────────────────

pub const COOKIE_UID_MAP_SIZE: u32 = 10_000;
pub const UID_COUNTERSET_MAP_SIZE: u32 = 4_000;
pub const APP_STATS_MAP_SIZE: u32 = 10_000;
pub const STATS_MAP_SIZE: u32 = 5_000;
pub const IFACE_STATS_MAP_SIZE: u32 = 1_000;
pub const UID_OWNER_MAP_SIZE: u32 = 4_000;
pub const UID_PERMISSION_MAP_SIZE: u32 = 4_000;
pub const INGRESS_DISCARD_MAP_SIZE: u32 = 100;
pub const LOCAL_NET_ACCESS_MAP_SIZE: u32 = 1_000;
pub const LOCAL_NET_BLOCKED_UID_MAP_SIZE: u32 = 1_000;
/// 65536 ports packed 64 per word.
pub const BLOCKED_PORTS_MAP_SIZE: u32 = 1_024;
pub const PACKET_TRACE_RINGBUF_SIZE: u32 = 8_192;
pub const CLAT_INGRESS6_MAP_SIZE: u32 = 16;
pub const CLAT_EGRESS4_MAP_SIZE: u32 = 16;

// ── Tagging quotas ──────────────────────────────────────────────────

/// Tagged entries one charge UID may own in the active stats map.
pub const PER_UID_STATS_ENTRIES_LIMIT: u32 = 500;
/// Tagged entries allowed in the active stats map (90% of capacity).
pub const TOTAL_UID_STATS_ENTRIES_LIMIT: u32 = STATS_MAP_SIZE / 10 * 9;
