//! Link and network layer constants.

// ── Ethertypes (host order) ─────────────────────────────────────────

pub const ETH_P_IP: u16 = 0x0800;
pub const ETH_P_IPV6: u16 = 0x86DD;
pub const ETH_HLEN: usize = 14;

// ── skb->pkt_type ───────────────────────────────────────────────────

pub const PACKET_HOST: u8 = 0;
pub const PACKET_BROADCAST: u8 = 1;
pub const PACKET_MULTICAST: u8 = 2;
pub const PACKET_OTHERHOST: u8 = 3;
pub const PACKET_OUTGOING: u8 = 4;

// ── IP protocol numbers ─────────────────────────────────────────────

pub const IPPROTO_HOPOPTS: u8 = 0;
pub const IPPROTO_ICMP: u8 = 1;
pub const IPPROTO_TCP: u8 = 6;
pub const IPPROTO_UDP: u8 = 17;
pub const IPPROTO_DCCP: u8 = 33;
pub const IPPROTO_FRAGMENT: u8 = 44;
pub const IPPROTO_GRE: u8 = 47;
pub const IPPROTO_ESP: u8 = 50;
pub const IPPROTO_ICMPV6: u8 = 58;
pub const IPPROTO_DSTOPTS: u8 = 60;
pub const IPPROTO_SCTP: u8 = 132;
pub const IPPROTO_UDPLITE: u8 = 136;
/// Linux uses 262 for MPTCP sockets; it never appears on the wire.
pub const IPPROTO_MPTCP: u16 = 262;

// ── Address families ────────────────────────────────────────────────

pub const AF_INET: u16 = 2;
pub const AF_INET6: u16 = 10;

// ── Header sizes and fields ─────────────────────────────────────────

pub const IPV4_HLEN: usize = 20;
pub const IPV6_HLEN: usize = 40;
pub const IPV6_FRAG_HLEN: usize = 8;
pub const TCP_HLEN: usize = 20;
pub const UDP_HLEN: usize = 8;

/// IPv4 "don't fragment" flag in host-order `frag_off`.
pub const IP_DF: u16 = 0x4000;
/// IPv4 "more fragments" flag in host-order `frag_off`.
pub const IP_MF: u16 = 0x2000;
pub const IP_OFFSET_MASK: u16 = 0x1FFF;

/// TCP flags word read as a big-endian u32 at transport offset 12.
pub const TCP_FLAG32_OFFSET: usize = 12;
pub const TCP_FLAG_FIN: u32 = 0x0001_0000;
pub const TCP_FLAG_RST: u32 = 0x0004_0000;

/// Loopback interface index.
pub const LOOPBACK_IFINDEX: u32 = 1;

/// Mark placed on frames the translator hands back for userspace fallback.
pub const CLAT_MARK: u32 = 0xDEAD_C1A7;

/// Bit of `skb->mark` set for frames that woke the device.
pub const WAKEUP_MARK_BIT: u32 = 0x8000_0000;

/// Whether `proto` carries 16-bit source/destination ports at the start of
/// its header.
#[inline]
pub const fn has_ports(proto: u8) -> bool {
    matches!(
        proto,
        IPPROTO_TCP | IPPROTO_DCCP | IPPROTO_UDP | IPPROTO_UDPLITE | IPPROTO_SCTP
    )
}
