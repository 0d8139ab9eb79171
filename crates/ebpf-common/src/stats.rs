//! Traffic accounting map layouts.

// ── Stats key: 16 bytes ────────────────────────────────────────────

/// Accounting bucket in the A/B stats maps.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StatsKey {
    pub uid: u32,
    pub tag: u32,
    pub counter_set: u32,
    pub iface_index: u32,
}

// ── Stats value: 32 bytes ──────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsValue {
    pub rx_packets: u64,
    pub rx_bytes: u64,
    pub tx_packets: u64,
    pub tx_bytes: u64,
}

// ── Cookie tag value: 8 bytes ──────────────────────────────────────

/// Accounting identity attached to a socket cookie.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct UidTagValue {
    pub uid: u32,
    pub tag: u32,
}
