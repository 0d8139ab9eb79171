use ebpf_common::net::{
    IPPROTO_ESP, IPPROTO_TCP, LOOPBACK_IFINDEX, TCP_FLAG_FIN, TCP_FLAG_RST, has_ports,
};
use ebpf_common::uid::{AID_DNS, TAG_SYSTEM_DNS, is_system_uid};

use crate::common::entity::{Direction, Environment};
use crate::packet::entity::SkBuff;
use crate::packet::extractor::{ExtHeaders, NetReader};

use super::entity::{LocalNetQuery, OwnerPolicy, UidOwnerEntry, UidRules, Verdict};

/// UID firewall evaluator.
///
/// Stateless apart from the environment: every input arrives through the
/// frame and the [`OwnerPolicy`] the caller read from the policy maps, so
/// evaluating the same inputs twice yields the same verdict.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirewallEvaluator {
    env: Environment,
}

impl FirewallEvaluator {
    pub fn new(env: Environment) -> Self {
        Self { env }
    }

    pub fn environment(&self) -> Environment {
        self.env
    }

    /// Per-packet owner match.
    ///
    /// Precedence: system UIDs, then the TCP-teardown/ESP exemption, then the
    /// allowlist and denylist classes, then ingress interface restrictions.
    pub fn owner_match(
        &self,
        skb: &SkBuff,
        uid: u32,
        direction: Direction,
        policy: &OwnerPolicy,
    ) -> Verdict {
        if is_system_uid(uid) {
            return Verdict::Pass;
        }
        if self.skip_owner_match(skb, direction) {
            return Verdict::Pass;
        }

        let loopback = skb.ifindex == LOOPBACK_IFINDEX;
        let mut enabled = policy.enabled;
        if loopback {
            enabled.remove(UidRules::BACKGROUND);
        }

        let owner = policy.owner.unwrap_or_default();
        if Self::is_blocked_by_uid_rules(enabled, owner.rules) {
            return Verdict::Drop;
        }

        if direction == Direction::Ingress && !loopback {
            if self.env.has_ingress_discard()
                && let Some(discard) = policy.ingress_discard
                && !discard.permits(skb.ifindex)
            {
                return Verdict::Drop;
            }
            if owner.rules.contains(UidRules::IIF_MATCH) {
                if owner.allowed_iif != 0 && skb.ifindex != owner.allowed_iif {
                    return Verdict::DropUnlessDns;
                }
            } else if owner.rules.contains(UidRules::LOCKDOWN_VPN) {
                return Verdict::DropUnlessDns;
            }
        }

        Verdict::Pass
    }

    /// Owner match for socket creation: only the UID rule classes apply.
    pub fn owner_firewall_match(
        uid: u32,
        enabled: UidRules,
        owner: Option<UidOwnerEntry>,
    ) -> Verdict {
        if is_system_uid(uid) {
            return Verdict::Pass;
        }
        let rules = owner.map(|o| o.rules).unwrap_or_default();
        if Self::is_blocked_by_uid_rules(enabled, rules) {
            Verdict::Drop
        } else {
            Verdict::Pass
        }
    }

    /// A UID is blocked when it holds an enabled denylist class, or lacks an
    /// enabled allowlist class.
    pub fn is_blocked_by_uid_rules(enabled: UidRules, rules: UidRules) -> bool {
        let denied = enabled & UidRules::DROP_IF_SET;
        if rules.intersects(denied) {
            return true;
        }
        let required = enabled & UidRules::DROP_IF_UNSET;
        !rules.contains(required)
    }

    /// Destination key for the ingress discard table, when the table applies
    /// to this frame.
    pub fn ingress_discard_key(&self, skb: &SkBuff, direction: Direction) -> Option<[u8; 16]> {
        if direction != Direction::Ingress
            || skb.ifindex == LOOPBACK_IFINDEX
            || !self.env.has_ingress_discard()
        {
            return None;
        }
        NetReader::new(skb, self.env).daddr6()
    }

    /// ESP always passes; TCP RST always passes; TCP FIN passes on ingress.
    /// Unreadable headers never exempt a packet.
    pub fn skip_owner_match(&self, skb: &SkBuff, direction: Direction) -> bool {
        let reader = NetReader::new(skb, self.env);
        let Some(loc) = reader.l4_location(ExtHeaders::Stop) else {
            return false;
        };
        if loc.proto == IPPROTO_ESP {
            return true;
        }
        if loc.proto != IPPROTO_TCP {
            return false;
        }
        let flags = reader.tcp_flag_word(loc.offset);
        let exempt = match direction {
            Direction::Egress => TCP_FLAG_RST,
            Direction::Ingress => TCP_FLAG_RST | TCP_FLAG_FIN,
        };
        flags & exempt != 0
    }

    /// Query for the local-network table, when local-network protection can
    /// still change `verdict` for `uid`.
    pub fn local_net_query(
        &self,
        skb: &SkBuff,
        uid: u32,
        direction: Direction,
        verdict: Verdict,
    ) -> Option<LocalNetQuery> {
        if !self.env.has_local_net_protection() || verdict == Verdict::Drop || is_system_uid(uid) {
            return None;
        }
        let reader = NetReader::new(skb, self.env);
        let remote_ip6 = reader.remote_addr6(direction)?;
        let loc = reader.l4_location(ExtHeaders::Stop)?;
        let remote_port = if has_ports(loc.proto) {
            match direction {
                Direction::Egress => reader.load_be16(loc.offset + 2),
                Direction::Ingress => reader.load_be16(loc.offset),
            }
        } else {
            0
        };
        Some(LocalNetQuery {
            if_index: skb.ifindex,
            remote_ip6,
            protocol: u16::from(loc.proto),
            remote_port,
        })
    }

    /// Apply the local-network table result. `access` is the LPM value;
    /// absent means allowed.
    pub fn local_net_verdict(verdict: Verdict, uid_blocked: bool, access: Option<bool>) -> Verdict {
        if uid_blocked && access == Some(false) {
            Verdict::Drop
        } else {
            verdict
        }
    }
}

/// Resolve the DNS carve-out. Returns the final verdict (never
/// `DropUnlessDns`) and the UID the traffic is billed to.
///
/// The resolver tags its own queries with `TAG_SYSTEM_DNS`; those are billed
/// to the socket owner and survive interface restrictions.
pub fn resolve_dns(verdict: Verdict, uid: u32, tag: u32, sock_uid: u32) -> (Verdict, u32) {
    if tag == TAG_SYSTEM_DNS && uid == AID_DNS {
        let v = match verdict {
            Verdict::DropUnlessDns => Verdict::Pass,
            other => other,
        };
        (v, sock_uid)
    } else {
        let v = match verdict {
            Verdict::DropUnlessDns => Verdict::Drop,
            other => other,
        };
        (v, uid)
    }
}
