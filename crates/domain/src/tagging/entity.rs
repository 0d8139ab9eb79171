use ebpf_common::config::{PER_UID_STATS_ENTRIES_LIMIT, TOTAL_UID_STATS_ENTRIES_LIMIT};
use ebpf_common::stats::StatsKey;
use serde::{Deserialize, Serialize};

/// Free stats entries the tag quota must leave for untagged accounting.
pub const MIN_UNTAGGED_HEADROOM: u32 = 100;

/// Arguments of a `tagSocket` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRequest {
    pub fd: i32,
    pub tag: u32,
    pub charge_uid: u32,
    pub real_uid: u32,
}

/// What the socket layer reports about an open descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketInfo {
    pub cookie: u64,
    pub family: u16,
    pub protocol: u16,
}

/// Limits on stats entries in the active generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagQuota {
    pub per_uid_limit: u32,
    pub total_limit: u32,
}

impl Default for TagQuota {
    fn default() -> Self {
        Self {
            per_uid_limit: PER_UID_STATS_ENTRIES_LIMIT,
            total_limit: TOTAL_UID_STATS_ENTRIES_LIMIT,
        }
    }
}

/// Entries counted in one pass over the active stats table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuotaUsage {
    pub total: u32,
    pub per_uid: u32,
}

impl QuotaUsage {
    pub fn record(&mut self, key: &StatsKey, charge_uid: u32) {
        self.total = self.total.saturating_add(1);
        if key.uid == charge_uid {
            self.per_uid = self.per_uid.saturating_add(1);
        }
    }
}

/// Result of a successful `untagSocket`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UntagOutcome {
    Removed,
    NotTagged,
}

impl UntagOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Removed => "removed",
            Self::NotTagged => "not_tagged",
        }
    }
}
