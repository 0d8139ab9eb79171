use std::sync::atomic::{AtomicU64, Ordering};

use ebpf_common::net::{IPV4_HLEN, IPV6_HLEN, TCP_HLEN};
use ebpf_common::stats::{StatsValue, UidTagValue};
use serde::{Deserialize, Serialize};

use crate::common::entity::Direction;

/// Frame size above which a frame is assumed to be a GSO/GRO aggregate.
pub const REFERENCE_MTU: u64 = 1500;
/// TCP timestamp option carried by every segment of an aggregate.
pub const TCP_TIMESTAMP_OPTION_LEN: u64 = 12;

/// Packets and bytes one frame contributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsDelta {
    pub packets: u64,
    pub bytes: u64,
}

impl StatsDelta {
    /// Delta for a frame of `len` bytes.
    ///
    /// Frames above the reference MTU are counted as the segments the peer
    /// actually sent: each carries IP + TCP + timestamp overhead.
    pub fn for_frame(len: u32, is_ipv6: bool) -> Self {
        let len = u64::from(len);
        if len <= REFERENCE_MTU {
            return Self {
                packets: 1,
                bytes: len,
            };
        }
        let ip_overhead = (if is_ipv6 { IPV6_HLEN } else { IPV4_HLEN }) as u64;
        let overhead = ip_overhead + TCP_HLEN as u64 + TCP_TIMESTAMP_OPTION_LEN;
        let mss = REFERENCE_MTU - overhead;
        let payload = len - overhead;
        let packets = payload.div_ceil(mss);
        Self {
            packets,
            bytes: overhead * packets + payload,
        }
    }
}

/// Live counters for one key. Every update is a single fetch-and-add.
#[derive(Debug, Default)]
pub struct StatsCounters {
    rx_packets: AtomicU64,
    rx_bytes: AtomicU64,
    tx_packets: AtomicU64,
    tx_bytes: AtomicU64,
}

impl StatsCounters {
    pub fn from_value(v: StatsValue) -> Self {
        Self {
            rx_packets: AtomicU64::new(v.rx_packets),
            rx_bytes: AtomicU64::new(v.rx_bytes),
            tx_packets: AtomicU64::new(v.tx_packets),
            tx_bytes: AtomicU64::new(v.tx_bytes),
        }
    }

    pub fn add(&self, direction: Direction, delta: StatsDelta) {
        let (packets, bytes) = match direction {
            Direction::Ingress => (&self.rx_packets, &self.rx_bytes),
            Direction::Egress => (&self.tx_packets, &self.tx_bytes),
        };
        packets.fetch_add(delta.packets, Ordering::Relaxed);
        bytes.fetch_add(delta.bytes, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsValue {
        StatsValue {
            rx_packets: self.rx_packets.load(Ordering::Relaxed),
            rx_bytes: self.rx_bytes.load(Ordering::Relaxed),
            tx_packets: self.tx_packets.load(Ordering::Relaxed),
            tx_bytes: self.tx_bytes.load(Ordering::Relaxed),
        }
    }
}

/// The (uid, tag) pair traffic is billed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountingIdentity {
    pub uid: u32,
    pub tag: u32,
}

impl From<UidTagValue> for AccountingIdentity {
    fn from(v: UidTagValue) -> Self {
        Self {
            uid: v.uid,
            tag: v.tag,
        }
    }
}

impl From<AccountingIdentity> for UidTagValue {
    fn from(id: AccountingIdentity) -> Self {
        Self {
            uid: id.uid,
            tag: id.tag,
        }
    }
}
