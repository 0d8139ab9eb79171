pub mod clat_map_port;
pub mod configuration_map_port;
pub mod cookie_tag_map_port;
pub mod metrics_port;
pub mod policy_map_port;
pub mod socket_info_port;
pub mod stats_map_port;
pub mod trace_sink;
