//! Bounds-checked header field reads relative to the network header.
//!
//! Every read either returns the requested bytes in full or an all-zero
//! buffer of the same length. Callers treat zero as "no information".

use ebpf_common::net::{
    IPPROTO_DSTOPTS, IPPROTO_HOPOPTS, IPV6_HLEN, TCP_FLAG32_OFFSET, has_ports,
};

use crate::common::entity::{Direction, Environment};

use super::entity::SkBuff;

// ── Header field offsets (relative to L3) ───────────────────────────

pub const IP4_OFF_IHL: usize = 0;
pub const IP4_OFF_PROTOCOL: usize = 9;
pub const IP4_OFF_SADDR: usize = 12;
pub const IP4_OFF_DADDR: usize = 16;

pub const IP6_OFF_NEXTHDR: usize = 6;
pub const IP6_OFF_SADDR: usize = 8;
pub const IP6_OFF_DADDR: usize = 24;

/// Whether to step over one hop-by-hop or destination-options header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtHeaders {
    Stop,
    SkipOne,
}

/// Where the transport header starts and what it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct L4Location {
    pub ip_version: u8,
    pub proto: u8,
    pub offset: usize,
}

/// Reader over one frame under a given environment.
#[derive(Debug, Clone, Copy)]
pub struct NetReader<'a> {
    skb: &'a SkBuff,
    env: Environment,
}

impl<'a> NetReader<'a> {
    pub fn new(skb: &'a SkBuff, env: Environment) -> Self {
        Self { skb, env }
    }

    pub fn skb(&self) -> &'a SkBuff {
        self.skb
    }

    /// Read `N` bytes at `offset` past the network header, or `None` if any
    /// byte is out of range. Kernels without relative loads cannot locate
    /// the network header behind a link header, so such reads fail.
    pub fn try_load<const N: usize>(&self, offset: usize) -> Option<[u8; N]> {
        if !self.env.has_relative_loads() && self.skb.has_l2_header() {
            return None;
        }
        let start = self.skb.network_offset.checked_add(offset)?;
        let end = start.checked_add(N)?;
        let src = self.skb.data.get(start..end)?;
        let mut out = [0u8; N];
        out.copy_from_slice(src);
        Some(out)
    }

    /// Read `N` bytes at `offset`, zero-filled on failure.
    pub fn load<const N: usize>(&self, offset: usize) -> [u8; N] {
        self.try_load(offset).unwrap_or([0u8; N])
    }

    pub fn load_u8(&self, offset: usize) -> u8 {
        self.load::<1>(offset)[0]
    }

    pub fn load_be16(&self, offset: usize) -> u16 {
        u16::from_be_bytes(self.load(offset))
    }

    pub fn load_be32(&self, offset: usize) -> u32 {
        u32::from_be_bytes(self.load(offset))
    }

    /// Locate the transport header. `None` for non-IP frames.
    pub fn l4_location(&self, ext: ExtHeaders) -> Option<L4Location> {
        if self.skb.is_ipv4() {
            let ihl = self.load_u8(IP4_OFF_IHL);
            Some(L4Location {
                ip_version: 4,
                proto: self.load_u8(IP4_OFF_PROTOCOL),
                offset: usize::from(ihl & 0x0F) * 4,
            })
        } else if self.skb.is_ipv6() {
            let mut loc = L4Location {
                ip_version: 6,
                proto: self.load_u8(IP6_OFF_NEXTHDR),
                offset: IPV6_HLEN,
            };
            if ext == ExtHeaders::SkipOne
                && matches!(loc.proto, IPPROTO_HOPOPTS | IPPROTO_DSTOPTS)
                && let Some([next, len]) = self.try_load::<2>(IPV6_HLEN)
            {
                loc.proto = next;
                loc.offset += (usize::from(len) + 1) * 8;
            }
            Some(loc)
        } else {
            None
        }
    }

    /// Source and destination ports (host order), zero for port-less protocols.
    pub fn ports(&self, loc: &L4Location) -> (u16, u16) {
        if !has_ports(loc.proto) {
            return (0, 0);
        }
        (self.load_be16(loc.offset), self.load_be16(loc.offset + 2))
    }

    /// TCP flags word (`tcp_flag_word`) as a big-endian u32, zero on failure.
    pub fn tcp_flag_word(&self, l4_offset: usize) -> u32 {
        self.load_be32(l4_offset + TCP_FLAG32_OFFSET)
    }

    /// Destination address as IPv6, IPv4 addresses v4-mapped.
    pub fn daddr6(&self) -> Option<[u8; 16]> {
        self.addr6(IP4_OFF_DADDR, IP6_OFF_DADDR)
    }

    /// Address of the remote peer: destination on egress, source on ingress.
    pub fn remote_addr6(&self, direction: Direction) -> Option<[u8; 16]> {
        match direction {
            Direction::Egress => self.addr6(IP4_OFF_DADDR, IP6_OFF_DADDR),
            Direction::Ingress => self.addr6(IP4_OFF_SADDR, IP6_OFF_SADDR),
        }
    }

    fn addr6(&self, v4_offset: usize, v6_offset: usize) -> Option<[u8; 16]> {
        if self.skb.is_ipv4() {
            Some(v4_mapped(self.load(v4_offset)))
        } else if self.skb.is_ipv6() {
            Some(self.load(v6_offset))
        } else {
            None
        }
    }
}

/// `::ffff:a.b.c.d`
pub fn v4_mapped(v4: [u8; 4]) -> [u8; 16] {
    let mut out = [0u8; 16];
    out[10] = 0xFF;
    out[11] = 0xFF;
    out[12..].copy_from_slice(&v4);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::entity::{KernelVersion, SdkLevel};
    use ebpf_common::net::{IPPROTO_TCP, IPPROTO_UDP, TCP_FLAG_RST};

    fn ipv4_tcp() -> Vec<u8> {
        let mut p = vec![0u8; 40];
        p[0] = 0x45;
        p[9] = IPPROTO_TCP;
        p[12..16].copy_from_slice(&[10, 0, 0, 1]);
        p[16..20].copy_from_slice(&[10, 0, 0, 2]);
        p[20..22].copy_from_slice(&443u16.to_be_bytes());
        p[22..24].copy_from_slice(&51000u16.to_be_bytes());
        p[33] = 0x04; // RST
        p
    }

    fn ipv6_udp_with_hopopts() -> Vec<u8> {
        let mut p = vec![0u8; 40 + 8 + 8];
        p[0] = 0x60;
        p[6] = IPPROTO_HOPOPTS;
        p[40] = IPPROTO_UDP;
        p[41] = 0;
        p[48..50].copy_from_slice(&53u16.to_be_bytes());
        p[50..52].copy_from_slice(&4000u16.to_be_bytes());
        p
    }

    #[test]
    fn load_zero_fills_past_end() {
        let skb = SkBuff::raw_ip(vec![0x45, 1, 2], 1);
        let r = NetReader::new(&skb, Environment::default());
        assert_eq!(r.load::<2>(1), [1, 2]);
        assert_eq!(r.load::<4>(1), [0, 0, 0, 0]);
        assert_eq!(r.load::<4>(usize::MAX), [0, 0, 0, 0]);
        assert!(r.try_load::<1>(3).is_none());
    }

    #[test]
    fn load_is_relative_to_network_header() {
        let mut frame = vec![0u8; 14];
        frame[12..14].copy_from_slice(&0x0800u16.to_be_bytes());
        frame.extend_from_slice(&ipv4_tcp());
        let skb = SkBuff::ethernet(frame, 2).unwrap();
        let r = NetReader::new(&skb, Environment::default());
        assert_eq!(r.load_u8(IP4_OFF_PROTOCOL), IPPROTO_TCP);
    }

    #[test]
    fn old_kernel_cannot_read_behind_link_header() {
        let mut frame = vec![0u8; 14];
        frame[12..14].copy_from_slice(&0x0800u16.to_be_bytes());
        frame.extend_from_slice(&ipv4_tcp());
        let skb = SkBuff::ethernet(frame, 2).unwrap();
        let env = Environment::new(KernelVersion::new(4, 14, 0), SdkLevel::T);
        let r = NetReader::new(&skb, env);
        assert_eq!(r.load_u8(IP4_OFF_PROTOCOL), 0);

        let raw = SkBuff::raw_ip(ipv4_tcp(), 2);
        let r = NetReader::new(&raw, env);
        assert_eq!(r.load_u8(IP4_OFF_PROTOCOL), IPPROTO_TCP);
    }

    #[test]
    fn ipv4_l4_location_and_ports() {
        let skb = SkBuff::raw_ip(ipv4_tcp(), 1);
        let r = NetReader::new(&skb, Environment::default());
        let loc = r.l4_location(ExtHeaders::Stop).unwrap();
        assert_eq!(loc, L4Location { ip_version: 4, proto: IPPROTO_TCP, offset: 20 });
        assert_eq!(r.ports(&loc), (443, 51000));
        assert_eq!(r.tcp_flag_word(loc.offset) & TCP_FLAG_RST, TCP_FLAG_RST);
    }

    #[test]
    fn ipv6_skips_exactly_one_extension_header() {
        let skb = SkBuff::raw_ip(ipv6_udp_with_hopopts(), 1);
        let r = NetReader::new(&skb, Environment::default());

        let skipped = r.l4_location(ExtHeaders::SkipOne).unwrap();
        assert_eq!(skipped.proto, IPPROTO_UDP);
        assert_eq!(skipped.offset, 48);
        assert_eq!(r.ports(&skipped), (53, 4000));

        let stopped = r.l4_location(ExtHeaders::Stop).unwrap();
        assert_eq!(stopped.proto, IPPROTO_HOPOPTS);
        assert_eq!(stopped.offset, 40);
        assert_eq!(r.ports(&stopped), (0, 0));
    }

    #[test]
    fn truncated_extension_header_leaves_location_unchanged() {
        let mut p = vec![0u8; 40];
        p[0] = 0x60;
        p[6] = IPPROTO_DSTOPTS;
        let skb = SkBuff::raw_ip(p, 1);
        let r = NetReader::new(&skb, Environment::default());
        let loc = r.l4_location(ExtHeaders::SkipOne).unwrap();
        assert_eq!(loc.proto, IPPROTO_DSTOPTS);
        assert_eq!(loc.offset, 40);
    }

    #[test]
    fn addresses_are_v4_mapped() {
        let skb = SkBuff::raw_ip(ipv4_tcp(), 1);
        let r = NetReader::new(&skb, Environment::default());
        assert_eq!(r.daddr6(), Some(v4_mapped([10, 0, 0, 2])));
        assert_eq!(r.remote_addr6(Direction::Ingress), Some(v4_mapped([10, 0, 0, 1])));
        assert_eq!(r.remote_addr6(Direction::Egress), Some(v4_mapped([10, 0, 0, 2])));
    }

    #[test]
    fn non_ip_has_no_location() {
        let mut skb = SkBuff::raw_ip(vec![0x00; 40], 1);
        skb.protocol = 0x0806;
        let r = NetReader::new(&skb, Environment::default());
        assert!(r.l4_location(ExtHeaders::SkipOne).is_none());
        assert!(r.daddr6().is_none());
    }
}
