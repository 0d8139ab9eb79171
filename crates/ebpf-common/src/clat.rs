//! clat (464XLAT CLAT) session map layouts.

// ── Ingress6: 36-byte key, 24-byte value ───────────────────────────

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ClatIngress6Key {
    pub iif: u32,
    /// The /96 NAT64 prefix (first 12 bytes significant).
    pub pfx96: [u8; 16],
    pub local6: [u8; 16],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClatIngress6Value {
    /// 0 = pass the translated frame up the stack instead of redirecting.
    pub oif: u32,
    pub local4: [u8; 4],
    pub packets: u64,
    pub bytes: u64,
}

// ── Egress4: 8-byte key, 56-byte value ─────────────────────────────

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ClatEgress4Key {
    pub iif: u32,
    pub local4: [u8; 4],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClatEgress4Value {
    pub local6: [u8; 16],
    pub pfx96: [u8; 16],
    pub oif: u32,
    pub oif_is_ethernet: u8,
    pub _pad: [u8; 3],
    pub packets: u64,
    pub bytes: u64,
}
