use ebpf_common::net::{ETH_HLEN, ETH_P_IP, ETH_P_IPV6, PACKET_HOST};
use ebpf_common::uid::OVERFLOW_UID;
use serde::{Deserialize, Serialize};

use super::error::PacketError;

/// Owning socket of a frame, as seen by the cgroup hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketRef {
    pub uid: u32,
    /// Kernel-unique socket identifier, never 0 for a real socket.
    pub cookie: u64,
}

/// A frame handed to a hook, with the metadata the kernel exposes.
///
/// `data` starts at the link-layer header when `network_offset` is non-zero
/// (ethernet) and at the IP header for raw-IP links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkBuff {
    pub data: Vec<u8>,
    #[serde(default)]
    pub network_offset: usize,
    /// Link-layer ethertype, host order.
    pub protocol: u16,
    pub ifindex: u32,
    #[serde(default)]
    pub mark: u32,
    #[serde(default)]
    pub pkt_type: u8,
    /// Running CHECKSUM_COMPLETE sum, when the device supplied one.
    #[serde(default)]
    pub csum: Option<u32>,
    #[serde(default)]
    pub socket: Option<SocketRef>,
}

impl SkBuff {
    /// Raw-IP frame; the ethertype is taken from the IP version nibble.
    pub fn raw_ip(data: Vec<u8>, ifindex: u32) -> Self {
        let protocol = match data.first().map(|b| b >> 4) {
            Some(4) => ETH_P_IP,
            Some(6) => ETH_P_IPV6,
            _ => 0,
        };
        Self {
            data,
            network_offset: 0,
            protocol,
            ifindex,
            mark: 0,
            pkt_type: PACKET_HOST,
            csum: None,
            socket: None,
        }
    }

    /// Ethernet frame; the ethertype is read from the link header.
    pub fn ethernet(data: Vec<u8>, ifindex: u32) -> Result<Self, PacketError> {
        if data.len() < ETH_HLEN {
            return Err(PacketError::Truncated {
                header: "ethernet",
                len: data.len(),
            });
        }
        let protocol = u16::from_be_bytes([data[12], data[13]]);
        Ok(Self {
            data,
            network_offset: ETH_HLEN,
            protocol,
            ifindex,
            mark: 0,
            pkt_type: PACKET_HOST,
            csum: None,
            socket: None,
        })
    }

    pub fn with_socket(mut self, uid: u32, cookie: u64) -> Self {
        self.socket = Some(SocketRef { uid, cookie });
        self
    }

    pub fn with_mark(mut self, mark: u32) -> Self {
        self.mark = mark;
        self
    }

    pub fn with_pkt_type(mut self, pkt_type: u8) -> Self {
        self.pkt_type = pkt_type;
        self
    }

    pub fn with_csum(mut self, csum: u32) -> Self {
        self.csum = Some(csum);
        self
    }

    /// Check the invariants a deserialized frame must satisfy.
    pub fn validate(&self) -> Result<(), PacketError> {
        if self.network_offset > self.data.len() {
            return Err(PacketError::NetworkOffsetOutOfRange {
                offset: self.network_offset,
                len: self.data.len(),
            });
        }
        Ok(())
    }

    /// `skb->len`: the whole frame including any link header.
    pub fn len(&self) -> u32 {
        u32::try_from(self.data.len()).unwrap_or(u32::MAX)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_ipv4(&self) -> bool {
        self.protocol == ETH_P_IP
    }

    pub fn is_ipv6(&self) -> bool {
        self.protocol == ETH_P_IPV6
    }

    pub fn has_l2_header(&self) -> bool {
        self.network_offset != 0
    }

    /// Bytes from the network header onwards. Empty if the offset is bogus.
    pub fn network(&self) -> &[u8] {
        self.data.get(self.network_offset..).unwrap_or(&[])
    }

    /// Socket UID as `bpf_get_socket_uid` reports it: overflow UID without a socket.
    pub fn sock_uid(&self) -> u32 {
        self.socket.map_or(OVERFLOW_UID, |s| s.uid)
    }

    /// Socket cookie, 0 without a socket.
    pub fn cookie(&self) -> u64 {
        self.socket.map_or(0, |s| s.cookie)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_ip_infers_protocol() {
        assert_eq!(SkBuff::raw_ip(vec![0x45, 0], 3).protocol, ETH_P_IP);
        assert_eq!(SkBuff::raw_ip(vec![0x60, 0], 3).protocol, ETH_P_IPV6);
        assert_eq!(SkBuff::raw_ip(vec![], 3).protocol, 0);
        assert!(!SkBuff::raw_ip(vec![0x45], 3).has_l2_header());
    }

    #[test]
    fn ethernet_reads_ethertype() {
        let mut frame = vec![0u8; 14];
        frame[12] = 0x86;
        frame[13] = 0xDD;
        frame.extend_from_slice(&[0x60, 0, 0, 0]);
        let skb = SkBuff::ethernet(frame, 2).unwrap();
        assert!(skb.is_ipv6());
        assert_eq!(skb.network(), &[0x60, 0, 0, 0]);
        assert_eq!(skb.len(), 18);
    }

    #[test]
    fn ethernet_rejects_short_frame() {
        assert!(matches!(
            SkBuff::ethernet(vec![0; 10], 2),
            Err(PacketError::Truncated { len: 10, .. })
        ));
    }

    #[test]
    fn socketless_frame_reports_overflow_uid() {
        let skb = SkBuff::raw_ip(vec![0x45], 1);
        assert_eq!(skb.sock_uid(), OVERFLOW_UID);
        assert_eq!(skb.cookie(), 0);
        let skb = skb.with_socket(10_001, 77);
        assert_eq!(skb.sock_uid(), 10_001);
        assert_eq!(skb.cookie(), 77);
    }

    #[test]
    fn validate_catches_bad_offset() {
        let mut skb = SkBuff::raw_ip(vec![0x45, 0, 0], 1);
        skb.network_offset = 4;
        assert!(skb.validate().is_err());
        assert!(skb.network().is_empty());
    }
}
