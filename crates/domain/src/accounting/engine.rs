use ebpf_common::net::{PACKET_BROADCAST, PACKET_HOST, PACKET_MULTICAST};
use ebpf_common::stats::{StatsKey, UidTagValue};
use ebpf_common::uid::{AID_CLAT, AID_ROOT, AID_SYSTEM, OVERFLOW_UID};

use crate::common::entity::Direction;
use crate::firewall::entity::Verdict;

use super::entity::AccountingIdentity;

/// Socket UID with the kernel overflow UID folded into root.
///
/// The overflow UID shows up for early-demux misses and timewait sockets;
/// treating it as root keeps such traffic on the system bypass.
pub fn normalize_sock_uid(sock_uid: u32) -> u32 {
    if sock_uid == OVERFLOW_UID {
        AID_ROOT
    } else {
        sock_uid
    }
}

/// Identity billed for a frame: the socket's tag entry, else the socket UID
/// with tag 0.
pub fn resolve_identity(sock_uid: u32, tag_entry: Option<UidTagValue>) -> AccountingIdentity {
    match tag_entry {
        Some(v) => v.into(),
        None => AccountingIdentity {
            uid: sock_uid,
            tag: 0,
        },
    }
}

/// Egress of the clat daemon is already accounted on the stacked v4
/// interface.
pub fn is_clat_egress(direction: Direction, identity: &AccountingIdentity) -> bool {
    direction.is_egress() && identity.uid == AID_CLAT
}

/// Whether a verdict still lets the frame be accounted. Dropped egress never
/// left the host.
pub fn accounts_verdict(direction: Direction, verdict: Verdict) -> bool {
    !(direction.is_egress() && verdict == Verdict::Drop)
}

/// Clat sockets are owned by the system server and tagged to the clat UID.
pub fn is_clat_socket(sock_uid: u32, tag_entry: Option<UidTagValue>) -> bool {
    sock_uid == AID_SYSTEM && tag_entry.is_some_and(|v| v.uid == AID_CLAT)
}

/// Frames addressed to this host (unicast, broadcast, multicast).
pub fn is_received_pkt_type(pkt_type: u8) -> bool {
    matches!(pkt_type, PACKET_HOST | PACKET_BROADCAST | PACKET_MULTICAST)
}

pub fn stats_key(identity: AccountingIdentity, counter_set: u8, ifindex: u32) -> StatsKey {
    StatsKey {
        uid: identity.uid,
        tag: identity.tag,
        counter_set: u32::from(counter_set),
        iface_index: ifindex,
    }
}
