pub mod clat_map_manager;
pub mod configuration_map_manager;
pub mod cookie_tag_map_manager;
pub mod map_store;
pub mod policy_map_manager;
pub mod stats_map_manager;
pub mod trace_ring_buffer;
