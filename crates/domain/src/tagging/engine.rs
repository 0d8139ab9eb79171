use ebpf_common::net::{AF_INET, AF_INET6, IPPROTO_TCP, IPPROTO_UDP};
use ebpf_common::uid::{AID_CLAT, AID_DNS, AID_ROOT, AID_SYSTEM, PERMISSION_UPDATE_DEVICE_STATS, app_id};

use crate::common::entity::Environment;

use super::entity::{MIN_UNTAGGED_HEADROOM, QuotaUsage, SocketInfo, TagQuota, TagRequest};
use super::error::TagError;

/// Whether `uid` may charge traffic to another UID.
///
/// `permission` is the uid_permission entry for the UID's app id.
pub fn has_update_device_stats_permission(uid: u32, permission: Option<u8>) -> bool {
    if permission.is_some_and(|p| p & PERMISSION_UPDATE_DEVICE_STATS != 0) {
        return true;
    }
    matches!(app_id(uid), AID_ROOT | AID_SYSTEM | AID_DNS)
}

/// Admission rules for socket tagging, evaluated in request order.
#[derive(Debug, Clone, Copy, Default)]
pub struct TagPolicy {
    env: Environment,
    quota: TagQuota,
}

impl TagPolicy {
    pub fn new(env: Environment, quota: TagQuota) -> Self {
        Self { env, quota }
    }

    pub fn quota(&self) -> TagQuota {
        self.quota
    }

    /// Identity checks that need no socket.
    pub fn authorize(&self, req: &TagRequest, real_permission: Option<u8>) -> Result<(), TagError> {
        if req.charge_uid != req.real_uid
            && !has_update_device_stats_permission(req.real_uid, real_permission)
        {
            return Err(TagError::ChargeNotPermitted {
                real_uid: req.real_uid,
                charge_uid: req.charge_uid,
            });
        }
        if req.charge_uid == AID_CLAT {
            return Err(TagError::ClatUid);
        }
        Ok(())
    }

    /// Sockets whose entry could never be reclaimed are refused.
    pub fn check_socket(&self, info: &SocketInfo) -> Result<(), TagError> {
        if info.family != AF_INET && info.family != AF_INET6 {
            return Err(TagError::UnsupportedFamily {
                family: info.family,
            });
        }
        if !self.env.has_sock_release_hook()
            && info.protocol != u16::from(IPPROTO_TCP)
            && info.protocol != u16::from(IPPROTO_UDP)
        {
            return Err(TagError::UnsupportedProtocol {
                protocol: info.protocol,
            });
        }
        Ok(())
    }

    pub fn check_quota(&self, charge_uid: u32, usage: QuotaUsage) -> Result<(), TagError> {
        if usage.total > self.quota.total_limit || usage.per_uid > self.quota.per_uid_limit {
            return Err(TagError::QuotaExceeded {
                uid: charge_uid,
                total: usage.total,
                per_uid: usage.per_uid,
            });
        }
        Ok(())
    }
}

impl TagQuota {
    /// The total limit must leave headroom in a stats table of `capacity`.
    pub fn validate(&self, capacity: u32) -> Result<(), TagError> {
        if capacity.saturating_sub(self.total_limit) <= MIN_UNTAGGED_HEADROOM
            || self.per_uid_limit > self.total_limit
        {
            return Err(TagError::QuotaTooLarge {
                total_limit: self.total_limit,
                capacity,
            });
        }
        Ok(())
    }
}
