use std::sync::Arc;

use ports::secondary::clat_map_port::ClatMapPort;
use ports::secondary::configuration_map_port::ConfigurationMapPort;
use ports::secondary::cookie_tag_map_port::CookieTagMapPort;
use ports::secondary::policy_map_port::PolicyMapPort;
use ports::secondary::stats_map_port::StatsMapPort;
use ports::secondary::trace_sink::PacketTraceSink;

/// Map ports shared by every hook service.
#[derive(Clone)]
pub struct MapPorts {
    pub configuration: Arc<dyn ConfigurationMapPort>,
    pub policy: Arc<dyn PolicyMapPort>,
    pub stats: Arc<dyn StatsMapPort>,
    pub cookie_tags: Arc<dyn CookieTagMapPort>,
    pub clat: Arc<dyn ClatMapPort>,
    pub trace: Arc<dyn PacketTraceSink>,
}
