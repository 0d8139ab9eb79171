//! Stateless 464XLAT CLAT header translation.
//!
//! Transport checksums are never touched: the clat IPv6 address is chosen
//! so that it is checksum-neutral with respect to the IPv4 address it
//! stands for.

use ebpf_common::clat::{ClatEgress4Key, ClatEgress4Value, ClatIngress6Key, ClatIngress6Value};
use ebpf_common::net::{
    CLAT_MARK, ETH_P_IP, ETH_P_IPV6, IP_DF, IPPROTO_ESP, IPPROTO_FRAGMENT, IPPROTO_GRE,
    IPPROTO_TCP, IPPROTO_UDP, IPPROTO_UDPLITE, IPV4_HLEN, IPV6_FRAG_HLEN, IPV6_HLEN, PACKET_HOST,
    UDP_HLEN,
};

use crate::common::entity::Environment;
use crate::packet::entity::SkBuff;

use super::checksum::{csum_add, fold, ipv4_header_checksum, ipv4_header_valid, sum16, sum16_negated};
use super::entity::{LinkType, TranslateOutcome};

/// Largest IPv6 payload whose IPv4 translation still fits `tot_len`.
const MAX_TRANSLATABLE_PAYLOAD: u16 = 0xFFFF - IPV4_HLEN as u16;

#[derive(Debug, Clone, Copy, Default)]
pub struct ClatTranslator {
    env: Environment,
}

impl ClatTranslator {
    pub fn new(env: Environment) -> Self {
        Self { env }
    }

    // ── Ingress: IPv6 → IPv4 ────────────────────────────────────────

    /// Session key for an IPv6 frame arriving on the uplink, or `None` when
    /// the frame is not a translation candidate.
    pub fn ingress6_key(&self, skb: &SkBuff, link: LinkType) -> Option<ClatIngress6Key> {
        let l2 = l2_len(link);
        if link == LinkType::Ethernet && skb.pkt_type != PACKET_HOST {
            return None;
        }
        if !skb.is_ipv6() {
            return None;
        }
        let ip6 = skb.data.get(l2..l2 + IPV6_HLEN)?;
        if ip6[0] >> 4 != 6 {
            return None;
        }
        if u16::from_be_bytes([ip6[4], ip6[5]]) > MAX_TRANSLATABLE_PAYLOAD {
            return None;
        }

        let mut pfx96 = [0u8; 16];
        pfx96[..12].copy_from_slice(&ip6[8..20]);
        let mut local6 = [0u8; 16];
        local6.copy_from_slice(&ip6[24..40]);
        Some(ClatIngress6Key {
            iif: skb.ifindex,
            pfx96,
            local6,
        })
    }

    /// Rewrite an IPv6 frame whose key matched `session` into IPv4.
    pub fn translate_ingress6(
        &self,
        skb: &mut SkBuff,
        link: LinkType,
        session: &ClatIngress6Value,
    ) -> TranslateOutcome {
        let l2 = l2_len(link);
        let Some(ip6) = skb.data.get(l2..l2 + IPV6_HLEN) else {
            return TranslateOutcome::Untouched;
        };
        let mut ip6_hdr = [0u8; IPV6_HLEN];
        ip6_hdr.copy_from_slice(ip6);

        let mut proto = ip6_hdr[6];
        let mut ip_id: u16 = 0;
        let mut frag_off: u16 = IP_DF;
        let Some(mut tot_len) =
            u16::from_be_bytes([ip6_hdr[4], ip6_hdr[5]]).checked_add(IPV4_HLEN as u16)
        else {
            return TranslateOutcome::Untouched;
        };
        let mut strip = IPV6_HLEN;

        if proto == IPPROTO_FRAGMENT {
            if !self.env.can_strip_fragment_header() {
                return TranslateOutcome::Untouched;
            }
            let Some(frag) = skb.data.get(l2 + IPV6_HLEN..l2 + IPV6_HLEN + IPV6_FRAG_HLEN) else {
                return TranslateOutcome::Untouched;
            };
            proto = frag[0];
            ip_id = u16::from_be_bytes([frag[6], frag[7]]);
            frag_off = repack_frag_off(u16::from_be_bytes([frag[2], frag[3]]));
            tot_len -= IPV6_FRAG_HLEN as u16;
            if usize::from(tot_len) < IPV4_HLEN {
                return TranslateOutcome::Untouched;
            }
            strip += IPV6_FRAG_HLEN;
        }

        if !matches!(
            proto,
            IPPROTO_TCP | IPPROTO_UDP | IPPROTO_UDPLITE | IPPROTO_GRE | IPPROTO_ESP
        ) {
            skb.mark = CLAT_MARK;
            return TranslateOutcome::Marked;
        }

        let tos = (ip6_hdr[0] << 4) | (ip6_hdr[1] >> 4);
        let mut ip4 = [0u8; IPV4_HLEN];
        ip4[0] = 0x45;
        ip4[1] = tos;
        ip4[2..4].copy_from_slice(&tot_len.to_be_bytes());
        ip4[4..6].copy_from_slice(&ip_id.to_be_bytes());
        ip4[6..8].copy_from_slice(&frag_off.to_be_bytes());
        ip4[8] = ip6_hdr[7];
        ip4[9] = proto;
        ip4[12..16].copy_from_slice(&ip6_hdr[20..24]);
        ip4[16..20].copy_from_slice(&session.local4);
        let check = ipv4_header_checksum(&ip4);
        ip4[10..12].copy_from_slice(&check.to_be_bytes());

        // The new header sums to zero, so only the IPv6 header leaves the sum.
        if let Some(csum) = skb.csum {
            skb.csum = Some(csum_add(csum, sum16_negated(&ip6_hdr)));
        }

        let mut out = Vec::with_capacity(skb.data.len() + IPV4_HLEN - strip);
        out.extend_from_slice(&skb.data[..l2]);
        if link == LinkType::Ethernet {
            out[12..14].copy_from_slice(&ETH_P_IP.to_be_bytes());
        }
        out.extend_from_slice(&ip4);
        out.extend_from_slice(skb.data.get(l2 + strip..).unwrap_or(&[]));
        skb.data = out;
        skb.protocol = ETH_P_IP;

        TranslateOutcome::Translated {
            bytes: (skb.data.len() - l2) as u64,
        }
    }

    // ── Egress: IPv4 → IPv6 ─────────────────────────────────────────

    /// Session key for a raw-IP IPv4 frame leaving the stacked interface, or
    /// `None` when the frame must go to the userspace daemon instead.
    pub fn egress4_key(&self, skb: &SkBuff) -> Option<ClatEgress4Key> {
        if !skb.is_ipv4() || skb.has_l2_header() {
            return None;
        }
        let ip4 = skb.data.get(..IPV4_HLEN)?;
        if ip4[0] >> 4 != 4 || ip4[0] & 0x0F != 5 {
            return None;
        }
        if ip4[16] & 0xF0 == 0xE0 {
            return None;
        }
        if !ipv4_header_valid(ip4) {
            return None;
        }
        if usize::from(u16::from_be_bytes([ip4[2], ip4[3]])) < IPV4_HLEN {
            return None;
        }
        if u16::from_be_bytes([ip4[6], ip4[7]]) & !IP_DF != 0 {
            return None;
        }
        match ip4[9] {
            IPPROTO_TCP | IPPROTO_UDPLITE | IPPROTO_GRE | IPPROTO_ESP => {}
            IPPROTO_UDP => {
                // A zero UDP checksum is invalid over IPv6; the daemon computes one.
                let udp = skb.data.get(IPV4_HLEN..IPV4_HLEN + UDP_HLEN)?;
                if udp[6] == 0 && udp[7] == 0 {
                    return None;
                }
            }
            _ => return None,
        }

        let mut local4 = [0u8; 4];
        local4.copy_from_slice(&ip4[12..16]);
        Some(ClatEgress4Key {
            iif: skb.ifindex,
            local4,
        })
    }

    /// Rewrite an IPv4 frame whose key matched `session` into IPv6.
    pub fn translate_egress4(
        &self,
        skb: &mut SkBuff,
        session: &ClatEgress4Value,
    ) -> TranslateOutcome {
        if session.oif == 0 || session.oif_is_ethernet != 0 {
            return TranslateOutcome::Untouched;
        }
        let Some(ip4) = skb.data.get(..IPV4_HLEN) else {
            return TranslateOutcome::Untouched;
        };
        let tos = ip4[1];
        let tot_len = u16::from_be_bytes([ip4[2], ip4[3]]);
        let Some(payload_len) = tot_len.checked_sub(IPV4_HLEN as u16) else {
            return TranslateOutcome::Untouched;
        };

        let mut ip6 = [0u8; IPV6_HLEN];
        ip6[0] = 0x60 | (tos >> 4);
        ip6[1] = (tos & 0x0F) << 4;
        ip6[4..6].copy_from_slice(&payload_len.to_be_bytes());
        ip6[6] = ip4[9];
        ip6[7] = ip4[8];
        ip6[8..24].copy_from_slice(&session.local6);
        ip6[24..36].copy_from_slice(&session.pfx96[..12]);
        ip6[36..40].copy_from_slice(&ip4[16..20]);

        // The verified IPv4 header sums to zero; only the IPv6 header is added.
        if let Some(csum) = skb.csum {
            skb.csum = Some(csum_add(csum, sum16(&ip6)));
        }

        let mut out = Vec::with_capacity(skb.data.len() + IPV6_HLEN - IPV4_HLEN);
        out.extend_from_slice(&ip6);
        out.extend_from_slice(&skb.data[IPV4_HLEN..]);
        skb.data = out;
        skb.protocol = ETH_P_IPV6;

        TranslateOutcome::Translated {
            bytes: skb.data.len() as u64,
        }
    }
}

fn l2_len(link: LinkType) -> usize {
    match link {
        LinkType::Ethernet => ebpf_common::net::ETH_HLEN,
        LinkType::RawIp => 0,
    }
}

/// IPv6 `frag_off` (13-bit offset, 2 reserved bits, M) to IPv4 `frag_off`
/// (reserved, DF, MF, 13-bit offset).
pub fn repack_frag_off(ipv6_frag_off: u16) -> u16 {
    ((ipv6_frag_off & 1) << 13) | (ipv6_frag_off >> 3)
}

/// Folded checksum of an IPv4 header as found on the wire.
pub fn ipv4_header_sum(header: &[u8]) -> u16 {
    fold(sum16(header))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::entity::{KernelVersion, SdkLevel};
    use ebpf_common::net::{IP_MF, IPPROTO_ICMPV6};
    use std::net::{Ipv4Addr, Ipv6Addr};

    const UPLINK: u32 = 3;
    const V4_IFACE: u32 = 9;

    fn pfx96() -> [u8; 16] {
        "64:ff9b::".parse::<Ipv6Addr>().unwrap().octets()
    }

    fn local6() -> [u8; 16] {
        "2001:db8::464".parse::<Ipv6Addr>().unwrap().octets()
    }

    const LOCAL4: [u8; 4] = [192, 0, 0, 4];
    const REMOTE4: [u8; 4] = [198, 51, 100, 7];

    fn ingress_value() -> ClatIngress6Value {
        ClatIngress6Value {
            oif: V4_IFACE,
            local4: LOCAL4,
            packets: 0,
            bytes: 0,
        }
    }

    fn egress_value() -> ClatEgress4Value {
        ClatEgress4Value {
            local6: local6(),
            pfx96: pfx96(),
            oif: UPLINK,
            oif_is_ethernet: 0,
            _pad: [0; 3],
            packets: 0,
            bytes: 0,
        }
    }

    /// IPv6 TCP from the NAT64 prefix to the clat address.
    fn ipv6_tcp(payload: &[u8]) -> Vec<u8> {
        let tcp_len = 20 + payload.len();
        let mut p = vec![0u8; IPV6_HLEN];
        p[0] = 0x6A; // traffic class 0xA5
        p[1] = 0x50;
        p[4..6].copy_from_slice(&(tcp_len as u16).to_be_bytes());
        p[6] = IPPROTO_TCP;
        p[7] = 61;
        let mut saddr = pfx96();
        saddr[12..].copy_from_slice(&REMOTE4);
        p[8..24].copy_from_slice(&saddr);
        p[24..40].copy_from_slice(&local6());
        let mut tcp = vec![0u8; 20];
        tcp[0..2].copy_from_slice(&443u16.to_be_bytes());
        tcp[2..4].copy_from_slice(&50000u16.to_be_bytes());
        tcp[12] = 0x50;
        tcp[16..18].copy_from_slice(&0xBEEFu16.to_be_bytes());
        p.extend_from_slice(&tcp);
        p.extend_from_slice(payload);
        p
    }

    fn ethernet(l3: Vec<u8>, ethertype: u16) -> Vec<u8> {
        let mut f = vec![0xAA; 12];
        f.extend_from_slice(&ethertype.to_be_bytes());
        f.extend_from_slice(&l3);
        f
    }

    /// Ones-complement equality; 0 and 0xFFFF are both zero.
    fn same_csum(a: u32, b: u32) -> bool {
        fold(a) % 0xFFFF == fold(b) % 0xFFFF
    }

    fn translator() -> ClatTranslator {
        ClatTranslator::new(Environment::default())
    }

    // ── Ingress ───────────────────────────────────────────────────

    #[test]
    fn ingress_key_uses_prefix_and_destination() {
        let skb = SkBuff::raw_ip(ipv6_tcp(b"hi"), UPLINK);
        let key = translator().ingress6_key(&skb, LinkType::RawIp).unwrap();
        assert_eq!(key.iif, UPLINK);
        assert_eq!(key.pfx96, pfx96());
        assert_eq!(key.local6, local6());
    }

    #[test]
    fn ingress_translates_header() {
        let original = ipv6_tcp(b"payload");
        let mut skb = SkBuff::raw_ip(original.clone(), UPLINK);
        let out = translator().translate_ingress6(&mut skb, LinkType::RawIp, &ingress_value());

        assert_eq!(out, TranslateOutcome::Translated { bytes: 20 + 20 + 7 });
        assert!(skb.is_ipv4());
        let ip4 = &skb.data[..20];
        assert_eq!(ip4[0], 0x45);
        assert_eq!(ip4[1], 0xA5);
        assert_eq!(u16::from_be_bytes([ip4[2], ip4[3]]), 47);
        assert_eq!(u16::from_be_bytes([ip4[6], ip4[7]]), IP_DF);
        assert_eq!(ip4[8], 61);
        assert_eq!(ip4[9], IPPROTO_TCP);
        assert_eq!(&ip4[12..16], &REMOTE4);
        assert_eq!(&ip4[16..20], &LOCAL4);
        assert!(ipv4_header_valid(ip4));
        assert_eq!(&skb.data[20..], &original[40..]);
    }

    #[test]
    fn ingress_ethernet_rewrites_ethertype() {
        let frame = ethernet(ipv6_tcp(b""), ETH_P_IPV6);
        let mut skb = SkBuff::ethernet(frame, UPLINK).unwrap();
        let t = translator();
        assert!(t.ingress6_key(&skb, LinkType::Ethernet).is_some());
        let out = t.translate_ingress6(&mut skb, LinkType::Ethernet, &ingress_value());
        assert_eq!(out, TranslateOutcome::Translated { bytes: 40 });
        assert_eq!(&skb.data[12..14], &ETH_P_IP.to_be_bytes());
        assert_eq!(&skb.data[..12], &[0xAA; 12]);
        assert_eq!(skb.data[14], 0x45);
    }

    #[test]
    fn ingress_ignores_frames_for_other_hosts() {
        let frame = ethernet(ipv6_tcp(b""), ETH_P_IPV6);
        let skb = SkBuff::ethernet(frame, UPLINK).unwrap().with_pkt_type(3);
        assert!(translator().ingress6_key(&skb, LinkType::Ethernet).is_none());
    }

    #[test]
    fn ingress_rejects_truncated_and_wrong_version() {
        let t = translator();
        let mut short = ipv6_tcp(b"");
        short.truncate(39);
        assert!(t.ingress6_key(&SkBuff::raw_ip(short, UPLINK), LinkType::RawIp).is_none());

        let mut bad = SkBuff::raw_ip(ipv6_tcp(b""), UPLINK);
        bad.data[0] = 0x40;
        assert!(t.ingress6_key(&bad, LinkType::RawIp).is_none());
    }

    #[test]
    fn ingress_rejects_oversize_payload_length() {
        let mut skb = SkBuff::raw_ip(ipv6_tcp(b""), UPLINK);
        skb.data[4..6].copy_from_slice(&(MAX_TRANSLATABLE_PAYLOAD + 1).to_be_bytes());
        assert!(translator().ingress6_key(&skb, LinkType::RawIp).is_none());
        skb.data[4..6].copy_from_slice(&MAX_TRANSLATABLE_PAYLOAD.to_be_bytes());
        assert!(translator().ingress6_key(&skb, LinkType::RawIp).is_some());
    }

    #[test]
    fn ingress_marks_untranslatable_protocol() {
        let mut data = ipv6_tcp(b"");
        data[6] = IPPROTO_ICMPV6;
        let mut skb = SkBuff::raw_ip(data.clone(), UPLINK);
        let out = translator().translate_ingress6(&mut skb, LinkType::RawIp, &ingress_value());
        assert_eq!(out, TranslateOutcome::Marked);
        assert_eq!(skb.mark, CLAT_MARK);
        assert_eq!(skb.data, data);
    }

    fn fragment(frag_off: u16, ident: u32) -> Vec<u8> {
        let inner = ipv6_tcp(b"fragment-data");
        let mut p = inner[..IPV6_HLEN].to_vec();
        let payload = &inner[IPV6_HLEN..];
        p[4..6].copy_from_slice(&((payload.len() + 8) as u16).to_be_bytes());
        p[6] = IPPROTO_FRAGMENT;
        p.push(IPPROTO_TCP);
        p.push(0);
        p.extend_from_slice(&frag_off.to_be_bytes());
        p.extend_from_slice(&ident.to_be_bytes());
        p.extend_from_slice(payload);
        p
    }

    #[test]
    fn fragment_header_is_repacked() {
        // offset 185 (x8 bytes), more-fragments set
        let v6_frag_off = (185 << 3) | 1;
        let mut skb = SkBuff::raw_ip(fragment(v6_frag_off, 0x1234_5678), UPLINK);
        let out = translator().translate_ingress6(&mut skb, LinkType::RawIp, &ingress_value());

        assert_eq!(out, TranslateOutcome::Translated { bytes: 20 + 20 + 13 });
        let ip4 = &skb.data[..20];
        let frag_off = u16::from_be_bytes([ip4[6], ip4[7]]);
        assert_eq!(frag_off & IP_MF, IP_MF);
        assert_eq!(frag_off & 0x1FFF, 185);
        assert_eq!(frag_off & IP_DF, 0);
        assert_eq!(u16::from_be_bytes([ip4[4], ip4[5]]), 0x5678);
        assert_eq!(u16::from_be_bytes([ip4[2], ip4[3]]), 53);
        assert_eq!(ip4[9], IPPROTO_TCP);
        assert!(ipv4_header_valid(ip4));
    }

    #[test]
    fn fragments_pass_on_old_kernels() {
        let env = Environment::new(KernelVersion::new(4, 9, 0), SdkLevel::T);
        let data = fragment(1, 7);
        let mut skb = SkBuff::raw_ip(data.clone(), UPLINK);
        let out = ClatTranslator::new(env).translate_ingress6(&mut skb, LinkType::RawIp, &ingress_value());
        assert_eq!(out, TranslateOutcome::Untouched);
        assert_eq!(skb.data, data);
    }

    #[test]
    fn undersized_fragment_passes() {
        let mut data = fragment(1, 7);
        data[4..6].copy_from_slice(&7u16.to_be_bytes());
        let mut skb = SkBuff::raw_ip(data, UPLINK);
        let out = translator().translate_ingress6(&mut skb, LinkType::RawIp, &ingress_value());
        assert_eq!(out, TranslateOutcome::Untouched);
    }

    #[test]
    fn repack_frag_off_examples() {
        assert_eq!(repack_frag_off(0), 0);
        assert_eq!(repack_frag_off(1), IP_MF);
        assert_eq!(repack_frag_off(8), 1);
        assert_eq!(repack_frag_off(0xFFF9), IP_MF | 0x1FFF);
    }

    #[test]
    fn ingress_adjusts_complete_checksum() {
        let data = ipv6_tcp(b"abc");
        let wire_sum = sum16(&data);
        let mut skb = SkBuff::raw_ip(data, UPLINK).with_csum(wire_sum);
        translator().translate_ingress6(&mut skb, LinkType::RawIp, &ingress_value());
        assert!(same_csum(skb.csum.unwrap(), sum16(&skb.data)));
    }

    // ── Egress ────────────────────────────────────────────────────

    fn ipv4_packet(proto: u8, l4: &[u8]) -> Vec<u8> {
        let mut p = vec![0u8; 20];
        p[0] = 0x45;
        p[1] = 0x2C;
        p[2..4].copy_from_slice(&((20 + l4.len()) as u16).to_be_bytes());
        p[6..8].copy_from_slice(&IP_DF.to_be_bytes());
        p[8] = 64;
        p[9] = proto;
        p[12..16].copy_from_slice(&LOCAL4);
        p[16..20].copy_from_slice(&REMOTE4);
        let c = ipv4_header_checksum(&p);
        p[10..12].copy_from_slice(&c.to_be_bytes());
        p.extend_from_slice(l4);
        p
    }

    #[test]
    fn egress_translates_header() {
        let l4 = [0x11u8; 24];
        let mut skb = SkBuff::raw_ip(ipv4_packet(IPPROTO_TCP, &l4), V4_IFACE);
        let t = translator();
        let key = t.egress4_key(&skb).unwrap();
        assert_eq!(key.local4, LOCAL4);
        assert_eq!(key.iif, V4_IFACE);

        let out = t.translate_egress4(&mut skb, &egress_value());
        assert_eq!(out, TranslateOutcome::Translated { bytes: 40 + 24 });
        assert!(skb.is_ipv6());
        let ip6 = &skb.data[..40];
        assert_eq!(ip6[0], 0x62);
        assert_eq!(ip6[1], 0xC0);
        assert_eq!(u16::from_be_bytes([ip6[4], ip6[5]]), 24);
        assert_eq!(ip6[6], IPPROTO_TCP);
        assert_eq!(ip6[7], 64);
        assert_eq!(&ip6[8..24], &local6());
        assert_eq!(&ip6[24..36], &pfx96()[..12]);
        assert_eq!(&ip6[36..40], &REMOTE4);
        assert_eq!(&skb.data[40..], &l4);
    }

    #[test]
    fn egress_rejects_bad_checksum_options_fragments_multicast() {
        let t = translator();
        let good = ipv4_packet(IPPROTO_TCP, &[0; 20]);

        let mut bad_sum = good.clone();
        bad_sum[10] ^= 0xFF;
        assert!(t.egress4_key(&SkBuff::raw_ip(bad_sum, V4_IFACE)).is_none());

        let mut options = good.clone();
        options[0] = 0x46;
        assert!(t.egress4_key(&SkBuff::raw_ip(options, V4_IFACE)).is_none());

        let mut frag = good.clone();
        frag[6..8].copy_from_slice(&IP_MF.to_be_bytes());
        frag[10..12].copy_from_slice(&[0, 0]);
        let c = ipv4_header_checksum(&frag[..20]);
        frag[10..12].copy_from_slice(&c.to_be_bytes());
        assert!(t.egress4_key(&SkBuff::raw_ip(frag, V4_IFACE)).is_none());

        let mut mcast = good.clone();
        mcast[16..20].copy_from_slice(&[224, 0, 0, 251]);
        mcast[10..12].copy_from_slice(&[0, 0]);
        let c = ipv4_header_checksum(&mcast[..20]);
        mcast[10..12].copy_from_slice(&c.to_be_bytes());
        assert!(t.egress4_key(&SkBuff::raw_ip(mcast, V4_IFACE)).is_none());

        assert!(t.egress4_key(&SkBuff::raw_ip(good, V4_IFACE)).is_some());
    }

    #[test]
    fn egress_udp_requires_checksum() {
        let t = translator();
        let mut udp = [0u8; 8];
        udp[6..8].copy_from_slice(&0x1234u16.to_be_bytes());
        assert!(t.egress4_key(&SkBuff::raw_ip(ipv4_packet(IPPROTO_UDP, &udp), V4_IFACE)).is_some());

        let zero = [0u8; 8];
        assert!(t.egress4_key(&SkBuff::raw_ip(ipv4_packet(IPPROTO_UDP, &zero), V4_IFACE)).is_none());

        let short = [0u8; 4];
        assert!(t.egress4_key(&SkBuff::raw_ip(ipv4_packet(IPPROTO_UDP, &short), V4_IFACE)).is_none());
    }

    #[test]
    fn egress_rejects_unknown_protocol_and_ethernet() {
        let t = translator();
        assert!(t.egress4_key(&SkBuff::raw_ip(ipv4_packet(1, &[0; 8]), V4_IFACE)).is_none());

        let frame = ethernet(ipv4_packet(IPPROTO_TCP, &[0; 20]), ETH_P_IP);
        let skb = SkBuff::ethernet(frame, V4_IFACE).unwrap();
        assert!(t.egress4_key(&skb).is_none());
    }

    #[test]
    fn egress_without_usable_oif_is_untouched() {
        let t = translator();
        let data = ipv4_packet(IPPROTO_TCP, &[0; 20]);

        let mut skb = SkBuff::raw_ip(data.clone(), V4_IFACE);
        let v = ClatEgress4Value { oif: 0, ..egress_value() };
        assert_eq!(t.translate_egress4(&mut skb, &v), TranslateOutcome::Untouched);

        let v = ClatEgress4Value { oif_is_ethernet: 1, ..egress_value() };
        assert_eq!(t.translate_egress4(&mut skb, &v), TranslateOutcome::Untouched);
        assert_eq!(skb.data, data);
    }

    #[test]
    fn egress_adjusts_complete_checksum() {
        let data = ipv4_packet(IPPROTO_TCP, &[7; 20]);
        let wire_sum = sum16(&data);
        let mut skb = SkBuff::raw_ip(data, V4_IFACE).with_csum(wire_sum);
        translator().translate_egress4(&mut skb, &egress_value());
        assert!(same_csum(skb.csum.unwrap(), sum16(&skb.data)));
    }

    // ── Round trip ────────────────────────────────────────────────

    #[test]
    fn round_trip_restores_address_relationship() {
        let t = translator();
        let original = ipv6_tcp(b"round-trip");
        let mut skb = SkBuff::raw_ip(original.clone(), UPLINK);
        assert!(t.ingress6_key(&skb, LinkType::RawIp).is_some());
        t.translate_ingress6(&mut skb, LinkType::RawIp, &ingress_value());

        // Reply direction: swapping addresses keeps the header checksum valid.
        let (src, dst) = (skb.data[12..16].to_vec(), skb.data[16..20].to_vec());
        skb.data[12..16].copy_from_slice(&dst);
        skb.data[16..20].copy_from_slice(&src);
        skb.ifindex = V4_IFACE;
        assert!(ipv4_header_valid(&skb.data[..20]));

        let key = t.egress4_key(&skb).unwrap();
        assert_eq!(Ipv4Addr::from(key.local4), Ipv4Addr::from(LOCAL4));
        t.translate_egress4(&mut skb, &egress_value());

        assert_eq!(&skb.data[8..24], &original[24..40]);
        assert_eq!(&skb.data[24..40], &original[8..24]);
        assert_eq!(&skb.data[40..], &original[40..]);
    }

    #[test]
    fn header_sum_helper() {
        let p = ipv4_packet(IPPROTO_TCP, &[]);
        assert_eq!(ipv4_header_sum(&p), 0xFFFF);
    }
}
