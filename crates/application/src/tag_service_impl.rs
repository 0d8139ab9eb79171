use std::sync::Arc;

use domain::common::entity::CounterGeneration;
use domain::common::error::{DomainError, MapError};
use domain::tagging::engine::TagPolicy;
use domain::tagging::entity::{QuotaUsage, TagRequest, UntagOutcome};
use domain::tagging::error::TagError;
use ebpf_common::config::CURRENT_STATS_MAP_CONFIGURATION_KEY;
use ebpf_common::stats::UidTagValue;
use ebpf_common::uid::app_id;
use ports::secondary::metrics_port::MetricsPort;
use ports::secondary::socket_info_port::SocketInfoPort;

use crate::map_ports::MapPorts;

/// `tagSocket` / `untagSocket`: bill a socket's traffic to another
/// (uid, tag) pair.
pub struct TagAppService {
    policy: TagPolicy,
    maps: MapPorts,
    sockets: Arc<dyn SocketInfoPort>,
    metrics: Arc<dyn MetricsPort>,
}

impl TagAppService {
    pub fn new(
        policy: TagPolicy,
        maps: MapPorts,
        sockets: Arc<dyn SocketInfoPort>,
        metrics: Arc<dyn MetricsPort>,
    ) -> Self {
        Self {
            policy,
            maps,
            sockets,
            metrics,
        }
    }

    pub fn tag_socket(&self, req: &TagRequest) -> Result<(), TagError> {
        let result = self.try_tag(req);
        match &result {
            Ok(()) => {
                tracing::debug!(fd = req.fd, tag = req.tag, uid = req.charge_uid, "socket tagged");
                self.metrics.record_tag_operation("tag", "ok");
            }
            Err(e) => {
                tracing::debug!(fd = req.fd, uid = req.charge_uid, error = %e, "tag refused");
                self.metrics.record_tag_operation("tag", e.errno_name());
            }
        }
        result
    }

    fn try_tag(&self, req: &TagRequest) -> Result<(), TagError> {
        if !self.maps.cookie_tags.is_available() {
            return Err(TagError::MapUnavailable);
        }
        let real_permission = self.maps.policy.uid_permission(app_id(req.real_uid));
        self.policy.authorize(req, real_permission)?;

        let info = self
            .sockets
            .socket_info(req.fd)
            .ok_or(TagError::BadDescriptor { fd: req.fd })?;
        self.policy.check_socket(&info)?;
        if info.cookie == 0 {
            return Err(TagError::BadDescriptor { fd: req.fd });
        }

        let usage = self.active_usage(req.charge_uid)?;
        self.policy.check_quota(req.charge_uid, usage)?;

        self.maps
            .cookie_tags
            .tag(
                info.cookie,
                UidTagValue {
                    uid: req.charge_uid,
                    tag: req.tag,
                },
            )
            .map_err(|e| self.map_failure(e))
    }

    /// Entries of the active stats generation, in total and for `charge_uid`.
    fn active_usage(&self, charge_uid: u32) -> Result<QuotaUsage, TagError> {
        let selector = self
            .maps
            .configuration
            .configuration(CURRENT_STATS_MAP_CONFIGURATION_KEY)
            .ok_or(MapError::OutOfRange {
                map: "configuration_map",
                index: CURRENT_STATS_MAP_CONFIGURATION_KEY,
            })?;
        let generation = CounterGeneration::from_config(selector)
            .ok_or(TagError::InvalidSelector { value: selector })?;

        let mut usage = QuotaUsage::default();
        self.maps
            .stats
            .for_each_key(generation, &mut |key| usage.record(key, charge_uid))
            .map_err(|e| self.map_failure(e))?;
        Ok(usage)
    }

    pub fn untag_socket(&self, fd: i32) -> Result<UntagOutcome, TagError> {
        let result = self.try_untag(fd);
        let label = match &result {
            Ok(outcome) => outcome.as_str(),
            Err(e) => e.errno_name(),
        };
        self.metrics.record_tag_operation("untag", label);
        result
    }

    fn try_untag(&self, fd: i32) -> Result<UntagOutcome, TagError> {
        let info = self
            .sockets
            .socket_info(fd)
            .ok_or(TagError::BadDescriptor { fd })?;
        if !self.maps.cookie_tags.is_available() {
            return Err(TagError::MapUnavailable);
        }
        match self.maps.cookie_tags.untag(info.cookie) {
            Ok(()) => Ok(UntagOutcome::Removed),
            Err(e) if e.is_not_found() => Ok(UntagOutcome::NotTagged),
            Err(e) => Err(self.map_failure(e)),
        }
    }

    fn map_failure(&self, e: DomainError) -> TagError {
        let map = e.map_name().unwrap_or("cookie_tag_map");
        self.metrics.record_map_error(map);
        tracing::warn!(map, error = %e, "tagging map operation failed");
        match e {
            DomainError::Map(m) => TagError::Map(m),
            _ => TagError::MapUnavailable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map_ports::test_support::ports;
    use adapters::ebpf::map_store::NetMaps;
    use adapters::socket::socket_table::SocketTable;
    use domain::accounting::entity::StatsDelta;
    use domain::common::entity::{Direction, Environment, KernelVersion, SdkLevel};
    use domain::tagging::entity::TagQuota;
    use ebpf_common::config::SELECT_MAP_B;
    use ebpf_common::net::{AF_INET, AF_INET6, IPPROTO_SCTP, IPPROTO_TCP, IPPROTO_UDP};
    use ebpf_common::stats::StatsKey;
    use ebpf_common::uid::{AID_CLAT, AID_SYSTEM, PERMISSION_UPDATE_DEVICE_STATS};
    use ports::secondary::configuration_map_port::ConfigurationMapPort;
    use ports::secondary::cookie_tag_map_port::CookieTagMapPort;
    use ports::secondary::policy_map_port::PolicyMapPort;
    use ports::secondary::stats_map_port::StatsMapPort;
    use ports::test_utils::NoopMetrics;

    const APP: u32 = 10_300;
    const OTHER: u32 = 10_301;

    struct Fixture {
        svc: TagAppService,
        maps: NetMaps,
        sockets: Arc<SocketTable>,
    }

    fn fixture_with(env: Environment, quota: TagQuota) -> Fixture {
        let maps = NetMaps::new();
        let sockets = Arc::new(SocketTable::new());
        let svc = TagAppService::new(
            TagPolicy::new(env, quota),
            ports(&maps),
            sockets.clone(),
            Arc::new(NoopMetrics),
        );
        Fixture { svc, maps, sockets }
    }

    fn fixture() -> Fixture {
        fixture_with(Environment::default(), TagQuota::default())
    }

    fn req(fd: i32, charge_uid: u32, real_uid: u32) -> TagRequest {
        TagRequest {
            fd,
            tag: 0xBEEF,
            charge_uid,
            real_uid,
        }
    }

    fn fill(maps: &NetMaps, generation: CounterGeneration, uid: u32, entries: u32) {
        for tag in 0..entries {
            maps.stats
                .accumulate(
                    generation,
                    StatsKey {
                        uid,
                        tag,
                        counter_set: 0,
                        iface_index: 1,
                    },
                    Direction::Egress,
                    StatsDelta::for_frame(100, false),
                )
                .unwrap();
        }
    }

    #[test]
    fn tag_then_untag() {
        let f = fixture();
        let cookie = f.sockets.open(5, AF_INET6, u16::from(IPPROTO_TCP));

        f.svc.tag_socket(&req(5, APP, APP)).unwrap();
        assert_eq!(
            f.maps.cookie_tag.lookup(cookie),
            Some(UidTagValue {
                uid: APP,
                tag: 0xBEEF
            })
        );

        // Re-tagging overwrites.
        f.svc
            .tag_socket(&TagRequest {
                tag: 7,
                ..req(5, APP, APP)
            })
            .unwrap();
        assert_eq!(f.maps.cookie_tag.lookup(cookie).unwrap().tag, 7);

        assert_eq!(f.svc.untag_socket(5), Ok(UntagOutcome::Removed));
        assert_eq!(f.svc.untag_socket(5), Ok(UntagOutcome::NotTagged));
        assert!(f.maps.cookie_tag.is_empty());
    }

    #[test]
    fn unavailable_map_refuses_everything() {
        let f = fixture();
        f.sockets.open(5, AF_INET, u16::from(IPPROTO_UDP));
        f.maps.cookie_tag.set_available(false);
        let err = f.svc.tag_socket(&req(5, APP, APP)).unwrap_err();
        assert_eq!(err, TagError::MapUnavailable);
        assert_eq!(err.errno(), 1);
        assert_eq!(f.svc.untag_socket(5), Err(TagError::MapUnavailable));
    }

    #[test]
    fn delegated_charging() {
        let f = fixture();
        f.sockets.open(5, AF_INET, u16::from(IPPROTO_TCP));
        assert!(matches!(
            f.svc.tag_socket(&req(5, OTHER, APP)),
            Err(TagError::ChargeNotPermitted { .. })
        ));
        f.maps
            .policy
            .set_uid_permission(APP, PERMISSION_UPDATE_DEVICE_STATS)
            .unwrap();
        f.svc.tag_socket(&req(5, OTHER, APP)).unwrap();
        f.svc.tag_socket(&req(5, OTHER, AID_SYSTEM)).unwrap();
        assert_eq!(
            f.svc.tag_socket(&req(5, AID_CLAT, AID_SYSTEM)),
            Err(TagError::ClatUid)
        );
    }

    #[test]
    fn socket_checks() {
        let f = fixture();
        assert_eq!(
            f.svc.tag_socket(&req(42, APP, APP)).unwrap_err().errno(),
            9
        );
        assert_eq!(f.svc.untag_socket(42).unwrap_err().errno(), 9);

        f.sockets.open(6, 1, 0);
        assert_eq!(
            f.svc.tag_socket(&req(6, APP, APP)).unwrap_err().errno(),
            97
        );

        f.sockets.open(7, AF_INET, u16::from(IPPROTO_SCTP));
        assert!(f.svc.tag_socket(&req(7, APP, APP)).is_ok());

        let old = fixture_with(
            Environment::new(KernelVersion::new(5, 4, 0), SdkLevel::T),
            TagQuota::default(),
        );
        old.sockets.open(7, AF_INET, u16::from(IPPROTO_SCTP));
        assert_eq!(
            old.svc.tag_socket(&req(7, APP, APP)).unwrap_err().errno(),
            93
        );
    }

    #[test]
    fn invalid_selector_is_einval() {
        let f = fixture();
        f.sockets.open(5, AF_INET, u16::from(IPPROTO_TCP));
        f.maps
            .configuration
            .set_configuration(CURRENT_STATS_MAP_CONFIGURATION_KEY, 9)
            .unwrap();
        assert_eq!(
            f.svc.tag_socket(&req(5, APP, APP)),
            Err(TagError::InvalidSelector { value: 9 })
        );
    }

    #[test]
    fn per_uid_quota_counts_active_generation_only() {
        let f = fixture_with(
            Environment::default(),
            TagQuota {
                per_uid_limit: 3,
                total_limit: 10,
            },
        );
        f.sockets.open(5, AF_INET, u16::from(IPPROTO_TCP));

        // Exactly at the limit still admits; one more entry trips it.
        fill(&f.maps, CounterGeneration::A, APP, 3);
        f.svc.tag_socket(&req(5, APP, APP)).unwrap();
        fill(&f.maps, CounterGeneration::A, APP, 4);
        let err = f.svc.tag_socket(&req(5, APP, APP)).unwrap_err();
        assert_eq!(err.errno(), 24);
        assert!(matches!(
            err,
            TagError::QuotaExceeded {
                total: 4,
                per_uid: 4,
                ..
            }
        ));

        // Another uid is only held to the global limit.
        f.svc.tag_socket(&req(5, OTHER, OTHER)).unwrap();

        // Switching to the empty generation lifts the limit.
        f.maps
            .configuration
            .set_configuration(CURRENT_STATS_MAP_CONFIGURATION_KEY, SELECT_MAP_B)
            .unwrap();
        f.svc.tag_socket(&req(5, APP, APP)).unwrap();
    }

    #[test]
    fn total_quota_applies_to_every_uid() {
        let f = fixture_with(
            Environment::default(),
            TagQuota {
                per_uid_limit: 3,
                total_limit: 5,
            },
        );
        f.sockets.open(5, AF_INET, u16::from(IPPROTO_TCP));
        fill(&f.maps, CounterGeneration::A, 1_000, 6);
        assert!(matches!(
            f.svc.tag_socket(&req(5, APP, APP)),
            Err(TagError::QuotaExceeded { total: 6, per_uid: 0, .. })
        ));
    }

    #[test]
    fn closed_socket_cannot_be_untagged() {
        let f = fixture();
        let cookie = f.sockets.open(5, AF_INET, u16::from(IPPROTO_UDP));
        f.svc.tag_socket(&req(5, APP, APP)).unwrap();
        assert_eq!(f.sockets.close(5).map(|s| s.cookie), Some(cookie));
        assert_eq!(f.svc.untag_socket(5).unwrap_err().errno(), 9);
        // The entry is left for the release hook.
        assert!(f.maps.cookie_tag.lookup(cookie).is_some());
    }
}
