//! Packet trace ring buffer event.

// ── Packet trace: 32 bytes ─────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PacketTrace {
    pub timestamp_ns: u64,
    pub ifindex: u32,
    pub length: u32,
    pub uid: u32,
    pub tag: u32,
    /// ICMP stores the type here.
    pub sport: u16,
    /// ICMP stores the code here.
    pub dport: u16,
    /// Bit 0: egress. Bit 1: wakeup.
    pub flags: u8,
    pub ip_proto: u8,
    pub tcp_flags: u8,
    pub ip_version: u8,
}

pub const TRACE_FLAG_EGRESS: u8 = 1 << 0;
pub const TRACE_FLAG_WAKEUP: u8 = 1 << 1;

impl PacketTrace {
    #[inline]
    pub fn egress(&self) -> bool {
        self.flags & TRACE_FLAG_EGRESS != 0
    }

    #[inline]
    pub fn wakeup(&self) -> bool {
        self.flags & TRACE_FLAG_WAKEUP != 0
    }
}
