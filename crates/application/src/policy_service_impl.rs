use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, bail};
use domain::clat::entity::{ClatEgressSession, ClatIngressSession};
use domain::common::entity::CounterGeneration;
use domain::firewall::entity::{IngressDiscardEntry, LocalNetRule, UidOwnerEntry, UidRules};
use ebpf_common::config::{CURRENT_STATS_MAP_CONFIGURATION_KEY, UID_RULES_CONFIGURATION_KEY};
use ports::secondary::metrics_port::MetricsPort;

use crate::map_ports::MapPorts;

/// Complete control-plane state pushed into the maps at startup.
#[derive(Debug, Clone)]
pub struct PolicySnapshot {
    pub enabled_rules: UidRules,
    pub active_generation: CounterGeneration,
    pub packet_trace: bool,
    pub uid_owners: Vec<(u32, UidOwnerEntry)>,
    /// Keyed by app id.
    pub permissions: Vec<(u32, u8)>,
    pub counter_sets: Vec<(u32, u8)>,
    pub ingress_discard: Vec<([u8; 16], IngressDiscardEntry)>,
    pub local_net_rules: Vec<LocalNetRule>,
    pub local_net_blocked_uids: Vec<u32>,
    pub blocked_ports: Vec<u16>,
    pub clat_ingress: Vec<ClatIngressSession>,
    pub clat_egress: Vec<ClatEgressSession>,
}

impl Default for PolicySnapshot {
    fn default() -> Self {
        Self {
            enabled_rules: UidRules::empty(),
            active_generation: CounterGeneration::A,
            packet_trace: false,
            uid_owners: Vec::new(),
            permissions: Vec::new(),
            counter_sets: Vec::new(),
            ingress_discard: Vec::new(),
            local_net_rules: Vec::new(),
            local_net_blocked_uids: Vec::new(),
            blocked_ports: Vec::new(),
            clat_ingress: Vec::new(),
            clat_egress: Vec::new(),
        }
    }
}

/// Writes policy into the maps and rotates the counter generations.
///
/// Writers are serialized; the hooks read concurrently and may observe a
/// partially applied snapshot.
pub struct PolicyAppService {
    maps: MapPorts,
    metrics: Arc<dyn MetricsPort>,
    write_mutex: Mutex<()>,
}

impl PolicyAppService {
    pub fn new(maps: MapPorts, metrics: Arc<dyn MetricsPort>) -> Self {
        Self {
            maps,
            metrics,
            write_mutex: Mutex::new(()),
        }
    }

    pub fn apply(&self, snapshot: &PolicySnapshot) -> anyhow::Result<()> {
        let _guard = self
            .write_mutex
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let config = &self.maps.configuration;
        config
            .set_configuration(UID_RULES_CONFIGURATION_KEY, snapshot.enabled_rules.bits())
            .context("failed to write enabled rule classes")?;
        config
            .set_configuration(
                CURRENT_STATS_MAP_CONFIGURATION_KEY,
                snapshot.active_generation.to_config(),
            )
            .context("failed to select the active stats map")?;
        config
            .set_packet_trace_enabled(snapshot.packet_trace)
            .context("failed to set the packet trace switch")?;

        let policy = &self.maps.policy;
        for (uid, entry) in &snapshot.uid_owners {
            policy
                .set_uid_owner(*uid, *entry)
                .with_context(|| format!("uid_owner entry for uid {uid}"))?;
        }
        for (app_id, permission) in &snapshot.permissions {
            policy
                .set_uid_permission(*app_id, *permission)
                .with_context(|| format!("permission entry for app id {app_id}"))?;
        }
        for (uid, set) in &snapshot.counter_sets {
            self.maps
                .stats
                .set_counter_set(*uid, *set)
                .with_context(|| format!("counter set for uid {uid}"))?;
        }
        for (addr, entry) in &snapshot.ingress_discard {
            policy
                .set_ingress_discard(*addr, *entry)
                .with_context(|| {
                    format!("ingress discard entry for {}", std::net::Ipv6Addr::from(*addr))
                })?;
        }
        for (i, rule) in snapshot.local_net_rules.iter().enumerate() {
            policy
                .add_local_net_rule(rule)
                .with_context(|| format!("local network rule #{i}"))?;
        }
        for uid in &snapshot.local_net_blocked_uids {
            policy
                .set_local_net_blocked_uid(*uid, true)
                .with_context(|| format!("local network block for uid {uid}"))?;
        }
        for port in &snapshot.blocked_ports {
            policy
                .set_port_blocked(*port, true)
                .with_context(|| format!("blocked port {port}"))?;
        }

        for session in &snapshot.clat_ingress {
            self.maps
                .clat
                .add_ingress_session(session)
                .with_context(|| format!("clat ingress session on ifindex {}", session.iif))?;
        }
        for session in &snapshot.clat_egress {
            self.maps
                .clat
                .add_egress_session(session)
                .with_context(|| format!("clat egress session on ifindex {}", session.iif))?;
        }

        tracing::info!(
            enabled_rules = snapshot.enabled_rules.bits(),
            generation = snapshot.active_generation.as_str(),
            uid_owners = snapshot.uid_owners.len(),
            local_net_rules = snapshot.local_net_rules.len(),
            blocked_ports = snapshot.blocked_ports.len(),
            clat_sessions = snapshot.clat_ingress.len() + snapshot.clat_egress.len(),
            "policy applied"
        );
        Ok(())
    }

    /// Generation the hooks currently account into.
    pub fn active_generation(&self) -> anyhow::Result<CounterGeneration> {
        let Some(value) = self
            .maps
            .configuration
            .configuration(CURRENT_STATS_MAP_CONFIGURATION_KEY)
        else {
            bail!("stats map selector slot is missing");
        };
        CounterGeneration::from_config(value)
            .with_context(|| format!("stats map selector holds invalid value {value}"))
    }

    /// Point the hooks at the other generation and return the one they left,
    /// which is then safe to read and clear.
    pub fn swap_generation(&self) -> anyhow::Result<CounterGeneration> {
        let _guard = self
            .write_mutex
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let current = self.active_generation()?;
        let next = current.other();
        if let Err(e) = self
            .maps
            .configuration
            .set_configuration(CURRENT_STATS_MAP_CONFIGURATION_KEY, next.to_config())
        {
            self.metrics
                .record_map_error(e.map_name().unwrap_or("configuration_map"));
            return Err(e).context("failed to swap the active stats map");
        }
        tracing::info!(from = current.as_str(), to = next.as_str(), "stats generation swapped");
        Ok(current)
    }

    /// Empty an inactive generation after it has been read.
    pub fn clear_generation(&self, generation: CounterGeneration) -> anyhow::Result<()> {
        let _guard = self
            .write_mutex
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if self.active_generation()? == generation {
            bail!("refusing to clear the active stats map {}", generation.as_str());
        }
        self.maps
            .stats
            .clear(generation)
            .with_context(|| format!("failed to clear stats map {}", generation.as_str()))
    }
}
