use ebpf_common::net::{IPPROTO_ICMP, IPPROTO_ICMPV6, IPPROTO_TCP, WAKEUP_MARK_BIT};
use ebpf_common::trace::{PacketTrace, TRACE_FLAG_EGRESS, TRACE_FLAG_WAKEUP};

use crate::common::entity::Direction;

use super::extractor::{ExtHeaders, NetReader};

/// TCP flags byte within the TCP header.
const TCP_FLAG8_OFFSET: usize = 13;

/// Build the trace record for one accounted packet.
///
/// Read failures leave the corresponding fields zero; a partial record is
/// preferred over none.
pub fn build_packet_trace(
    reader: &NetReader<'_>,
    direction: Direction,
    uid: u32,
    tag: u32,
    timestamp_ns: u64,
) -> PacketTrace {
    let skb = reader.skb();
    let loc = reader.l4_location(ExtHeaders::SkipOne);

    let (ip_version, proto) = loc.map_or((0, 0), |l| (l.ip_version, l.proto));
    let mut tcp_flags = 0;
    let mut sport = 0;
    let mut dport = 0;

    if let Some(loc) = loc
        && loc.offset >= 20
    {
        match loc.proto {
            IPPROTO_ICMP | IPPROTO_ICMPV6 => {
                sport = u16::from(reader.load_u8(loc.offset));
                dport = u16::from(reader.load_u8(loc.offset + 1));
            }
            _ => {
                if loc.proto == IPPROTO_TCP {
                    tcp_flags = reader.load_u8(loc.offset + TCP_FLAG8_OFFSET);
                }
                (sport, dport) = reader.ports(&loc);
            }
        }
    }

    let mut flags = 0;
    if direction.is_egress() {
        flags |= TRACE_FLAG_EGRESS;
    } else if skb.mark & WAKEUP_MARK_BIT != 0 {
        flags |= TRACE_FLAG_WAKEUP;
    }

    PacketTrace {
        timestamp_ns,
        ifindex: skb.ifindex,
        length: skb.len(),
        uid,
        tag,
        sport,
        dport,
        flags,
        ip_proto: proto,
        tcp_flags,
        ip_version,
    }
}
