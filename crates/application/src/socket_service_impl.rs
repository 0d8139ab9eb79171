use std::sync::Arc;

use domain::firewall::engine::FirewallEvaluator;
use domain::firewall::entity::{UidRules, Verdict};
use ebpf_common::config::{DEFAULT_CONFIG, UID_RULES_CONFIGURATION_KEY};
use ebpf_common::net::{
    IPPROTO_DCCP, IPPROTO_MPTCP, IPPROTO_SCTP, IPPROTO_TCP, IPPROTO_UDP, IPPROTO_UDPLITE,
};
use ebpf_common::uid::{PERMISSION_INTERNET, app_id};
use ports::secondary::metrics_port::MetricsPort;

use crate::hook::{HookResult, SockAddr, SockVerdict};
use crate::map_ports::MapPorts;

/// Socket lifecycle and address hooks (cgroup sock / sock_addr).
pub struct SocketHookAppService {
    maps: MapPorts,
    metrics: Arc<dyn MetricsPort>,
}

impl SocketHookAppService {
    pub fn new(maps: MapPorts, metrics: Arc<dyn MetricsPort>) -> Self {
        Self { maps, metrics }
    }

    /// Socket creation by `uid`: needs the INTERNET permission and must not
    /// be blocked by an enabled rule class. Apps without a permission entry
    /// hold INTERNET only.
    pub fn inet_socket_create(&self, uid: u32) -> SockVerdict {
        let permission = self
            .maps
            .policy
            .uid_permission(app_id(uid))
            .unwrap_or(PERMISSION_INTERNET);
        let verdict = if permission & PERMISSION_INTERNET == 0 {
            SockVerdict::Disallow
        } else {
            let enabled = self
                .maps
                .configuration
                .configuration(UID_RULES_CONFIGURATION_KEY)
                .unwrap_or(DEFAULT_CONFIG);
            let owner = self.maps.policy.uid_owner(uid);
            match FirewallEvaluator::owner_firewall_match(
                uid,
                UidRules::from_bits_truncate(enabled),
                owner,
            ) {
                Verdict::Pass => SockVerdict::Allow,
                _ => SockVerdict::Disallow,
            }
        };
        if verdict == SockVerdict::Disallow {
            tracing::debug!(uid, permission, "socket creation refused");
        }
        self.finish("inet_socket_create", verdict)
    }

    /// Socket release: the socket's tag entry goes with it.
    pub fn inet_socket_release(&self, cookie: u64) {
        if cookie == 0 {
            return;
        }
        if let Err(e) = self.maps.cookie_tags.untag(cookie)
            && !e.is_not_found()
        {
            self.metrics.record_map_error(e.map_name().unwrap_or("cookie_tag_map"));
            tracing::warn!(cookie, error = %e, "failed to drop tag of released socket");
        }
    }

    pub fn inet4_bind(&self, addr: &SockAddr) -> SockVerdict {
        self.finish("inet4_bind", self.block_port(addr))
    }

    pub fn inet6_bind(&self, addr: &SockAddr) -> SockVerdict {
        self.finish("inet6_bind", self.block_port(addr))
    }

    // No localhost restrictions are defined for these yet.

    pub fn inet4_connect(&self, _addr: &SockAddr) -> SockVerdict {
        SockVerdict::Allow
    }

    pub fn inet6_connect(&self, _addr: &SockAddr) -> SockVerdict {
        SockVerdict::Allow
    }

    pub fn udp4_sendmsg(&self, _addr: &SockAddr) -> SockVerdict {
        SockVerdict::Allow
    }

    pub fn udp6_sendmsg(&self, _addr: &SockAddr) -> SockVerdict {
        SockVerdict::Allow
    }

    pub fn udp4_recvmsg(&self, _addr: &SockAddr) -> SockVerdict {
        SockVerdict::Allow
    }

    pub fn udp6_recvmsg(&self, _addr: &SockAddr) -> SockVerdict {
        SockVerdict::Allow
    }

    fn block_port(&self, addr: &SockAddr) -> SockVerdict {
        if addr.port == 0 || !is_port_protocol(addr.protocol) {
            return SockVerdict::Allow;
        }
        if self.maps.policy.is_port_blocked(addr.port) {
            SockVerdict::Disallow
        } else {
            SockVerdict::Allow
        }
    }

    fn finish(&self, hook: &str, verdict: SockVerdict) -> SockVerdict {
        self.metrics.record_packet(hook, verdict.as_str());
        verdict
    }
}

/// Protocols whose binds the blocked-port table governs.
fn is_port_protocol(protocol: u16) -> bool {
    protocol == IPPROTO_MPTCP
        || u8::try_from(protocol).is_ok_and(|p| {
            matches!(
                p,
                IPPROTO_TCP | IPPROTO_UDP | IPPROTO_UDPLITE | IPPROTO_DCCP | IPPROTO_SCTP
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map_ports::test_support::ports;
    use adapters::ebpf::map_store::NetMaps;
    use domain::firewall::entity::UidOwnerEntry;
    use ebpf_common::net::{AF_INET, AF_INET6, IPPROTO_ICMP};
    use ebpf_common::stats::UidTagValue;
    use ebpf_common::uid::{AID_SYSTEM, PERMISSION_NONE, PERMISSION_UPDATE_DEVICE_STATS};
    use ports::secondary::configuration_map_port::ConfigurationMapPort;
    use ports::secondary::cookie_tag_map_port::CookieTagMapPort;
    use ports::secondary::policy_map_port::PolicyMapPort;
    use ports::test_utils::NoopMetrics;

    const APP: u32 = 10_200;

    fn service() -> (SocketHookAppService, NetMaps) {
        let maps = NetMaps::new();
        (
            SocketHookAppService::new(ports(&maps), Arc::new(NoopMetrics)),
            maps,
        )
    }

    fn addr(family: u16, protocol: u16, port: u16) -> SockAddr {
        SockAddr {
            family,
            protocol,
            port,
        }
    }

    #[test]
    fn create_defaults_to_internet_permission() {
        let (svc, _maps) = service();
        assert_eq!(svc.inet_socket_create(APP), SockVerdict::Allow);
    }

    #[test]
    fn create_without_internet_is_refused() {
        let (svc, maps) = service();
        maps.policy.set_uid_permission(APP, PERMISSION_NONE).unwrap();
        assert_eq!(svc.inet_socket_create(APP), SockVerdict::Disallow);
        // Same app in a secondary user.
        assert_eq!(svc.inet_socket_create(10 * 100_000 + APP), SockVerdict::Disallow);

        maps.policy
            .set_uid_permission(APP, PERMISSION_UPDATE_DEVICE_STATS)
            .unwrap();
        assert_eq!(svc.inet_socket_create(APP), SockVerdict::Disallow);
    }

    #[test]
    fn create_applies_rule_classes() {
        let (svc, maps) = service();
        maps.configuration
            .set_configuration(UID_RULES_CONFIGURATION_KEY, UidRules::DOZABLE.bits())
            .unwrap();
        assert_eq!(svc.inet_socket_create(APP), SockVerdict::Disallow);
        assert_eq!(svc.inet_socket_create(AID_SYSTEM), SockVerdict::Allow);

        maps.policy
            .set_uid_owner(
                APP,
                UidOwnerEntry {
                    rules: UidRules::DOZABLE,
                    allowed_iif: 0,
                },
            )
            .unwrap();
        assert_eq!(svc.inet_socket_create(APP), SockVerdict::Allow);
    }

    #[test]
    fn release_drops_tag() {
        let (svc, maps) = service();
        maps.cookie_tag
            .tag(77, UidTagValue { uid: APP, tag: 1 })
            .unwrap();
        svc.inet_socket_release(77);
        assert!(maps.cookie_tag.lookup(77).is_none());
        // Untagged and cookie-less sockets are fine too.
        svc.inet_socket_release(77);
        svc.inet_socket_release(0);
    }

    #[test]
    fn bind_honours_blocked_ports() {
        let (svc, maps) = service();
        maps.policy.set_port_blocked(8080, true).unwrap();
        let tcp = u16::from(IPPROTO_TCP);

        assert_eq!(svc.inet4_bind(&addr(AF_INET, tcp, 8080)), SockVerdict::Disallow);
        assert_eq!(
            svc.inet6_bind(&addr(AF_INET6, IPPROTO_MPTCP, 8080)),
            SockVerdict::Disallow
        );
        assert_eq!(svc.inet4_bind(&addr(AF_INET, tcp, 8081)), SockVerdict::Allow);
        assert_eq!(svc.inet4_bind(&addr(AF_INET, tcp, 0)), SockVerdict::Allow);
        assert_eq!(
            svc.inet4_bind(&addr(AF_INET, u16::from(IPPROTO_ICMP), 8080)),
            SockVerdict::Allow
        );
    }

    #[test]
    fn address_hooks_allow() {
        let (svc, _maps) = service();
        let a = addr(AF_INET, u16::from(IPPROTO_UDP), 53);
        assert_eq!(svc.inet4_connect(&a), SockVerdict::Allow);
        assert_eq!(svc.inet6_connect(&a), SockVerdict::Allow);
        assert_eq!(svc.udp4_sendmsg(&a), SockVerdict::Allow);
        assert_eq!(svc.udp6_sendmsg(&a), SockVerdict::Allow);
        assert_eq!(svc.udp4_recvmsg(&a), SockVerdict::Allow);
        assert_eq!(svc.udp6_recvmsg(&a), SockVerdict::Allow);
    }

    #[test]
    fn port_protocols() {
        assert!(is_port_protocol(u16::from(IPPROTO_SCTP)));
        assert!(is_port_protocol(IPPROTO_MPTCP));
        assert!(!is_port_protocol(u16::from(IPPROTO_ICMP)));
        assert!(!is_port_protocol(0x100 + u16::from(IPPROTO_TCP)));
    }
}
