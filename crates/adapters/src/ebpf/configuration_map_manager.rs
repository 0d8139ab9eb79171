use std::sync::atomic::{AtomicBool, Ordering};

use domain::common::error::DomainError;
use ebpf_common::config::CONFIGURATION_MAP_SIZE;
use ports::secondary::configuration_map_port::ConfigurationMapPort;
use tracing::info;

use crate::maps::array_map::ArrayMap;

/// Manages the `configuration_map` array and the packet-trace switch.
pub struct ConfigurationMapManager {
    config: ArrayMap<u32>,
    trace_enabled: AtomicBool,
}

impl ConfigurationMapManager {
    pub fn new() -> Self {
        Self {
            config: ArrayMap::new("configuration_map", CONFIGURATION_MAP_SIZE),
            trace_enabled: AtomicBool::new(false),
        }
    }
}

impl Default for ConfigurationMapManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigurationMapPort for ConfigurationMapManager {
    fn configuration(&self, key: u32) -> Option<u32> {
        self.config.get(key)
    }

    fn set_configuration(&self, key: u32, value: u32) -> Result<(), DomainError> {
        self.config.set(key, value)?;
        info!(key, value, "configuration slot updated");
        Ok(())
    }

    fn packet_trace_enabled(&self) -> bool {
        self.trace_enabled.load(Ordering::Relaxed)
    }

    fn set_packet_trace_enabled(&self, enabled: bool) -> Result<(), DomainError> {
        self.trace_enabled.store(enabled, Ordering::Relaxed);
        info!(enabled, "packet trace switch updated");
        Ok(())
    }
}
