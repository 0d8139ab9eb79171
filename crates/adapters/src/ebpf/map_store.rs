use std::sync::Arc;

use super::clat_map_manager::ClatMapManager;
use super::configuration_map_manager::ConfigurationMapManager;
use super::cookie_tag_map_manager::CookieTagMapManager;
use super::policy_map_manager::PolicyMapManager;
use super::stats_map_manager::StatsMapManager;
use super::trace_ring_buffer::TraceRingBuffer;

/// Every table the hooks share, created together.
#[derive(Clone)]
pub struct NetMaps {
    pub configuration: Arc<ConfigurationMapManager>,
    pub policy: Arc<PolicyMapManager>,
    pub stats: Arc<StatsMapManager>,
    pub cookie_tag: Arc<CookieTagMapManager>,
    pub clat: Arc<ClatMapManager>,
    pub trace: Arc<TraceRingBuffer>,
}

impl NetMaps {
    pub fn new() -> Self {
        Self {
            configuration: Arc::new(ConfigurationMapManager::new()),
            policy: Arc::new(PolicyMapManager::new()),
            stats: Arc::new(StatsMapManager::new()),
            cookie_tag: Arc::new(CookieTagMapManager::new()),
            clat: Arc::new(ClatMapManager::new()),
            trace: Arc::new(TraceRingBuffer::new()),
        }
    }
}

impl Default for NetMaps {
    fn default() -> Self {
        Self::new()
    }
}
