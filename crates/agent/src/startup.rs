use std::path::Path;
use std::sync::Arc;

use adapters::ebpf::map_store::NetMaps;
use adapters::socket::socket_table::SocketTable;
use anyhow::{Context, bail};
use application::clat_service_impl::ClatAppService;
use application::map_ports::MapPorts;
use application::policy_service_impl::{PolicyAppService, PolicySnapshot};
use application::socket_service_impl::SocketHookAppService;
use application::tag_service_impl::TagAppService;
use application::traffic_service_impl::TrafficAppService;
use domain::common::entity::CounterGeneration;
use domain::tagging::engine::TagPolicy;
use ebpf_common::config::{
    CURRENT_STATS_MAP_CONFIGURATION_KEY, STATS_MAP_SIZE, UID_RULES_CONFIGURATION_KEY,
};
use infrastructure::config::{AgentConfig, ConfigError};
use infrastructure::constants::STATS_MAP_FILL_WARN_THRESHOLD;
use infrastructure::logging::init_logging;
use infrastructure::metrics::AgentMetrics;
use ports::secondary::configuration_map_port::ConfigurationMapPort;
use tracing::{info, warn};

use crate::cli::Cli;

/// Every service the hooks run through, wired to one set of maps.
pub struct Agent {
    pub config: AgentConfig,
    pub maps: NetMaps,
    pub sockets: Arc<SocketTable>,
    pub metrics: Arc<AgentMetrics>,
    pub policy: PolicyAppService,
    pub traffic: TrafficAppService,
    pub socket_hooks: SocketHookAppService,
    pub tagging: TagAppService,
    pub clat: ClatAppService,
}

/// Load the config and install logging. CLI flags take precedence over
/// the config file.
pub fn init(cli: &Cli) -> anyhow::Result<AgentConfig> {
    let config = AgentConfig::load(Path::new(&cli.config))
        .with_context(|| format!("failed to load {}", cli.config))?;

    let log_level = cli.log_level.unwrap_or(config.agent.log_level);
    let log_format = cli.log_format.unwrap_or(config.agent.log_format);
    init_logging(log_level, log_format)?;

    info!(
        config_path = %cli.config,
        log_level = log_level.as_str(),
        log_format = log_format.as_str(),
        kernel = %config.environment.kernel,
        sdk = %config.environment.sdk,
        "netguard agent starting"
    );
    Ok(config)
}

/// Flatten the validated config into the map contents.
pub fn snapshot(config: &AgentConfig) -> Result<PolicySnapshot, ConfigError> {
    let (clat_ingress, clat_egress) = config.clat.sessions()?.into_iter().unzip();
    Ok(PolicySnapshot {
        enabled_rules: config.policy.enabled_rules()?,
        active_generation: config.accounting.active_generation,
        packet_trace: config.accounting.packet_trace,
        uid_owners: config.policy.uid_owners()?,
        permissions: config.policy.permission_entries()?,
        counter_sets: config.policy.counter_set_entries(),
        ingress_discard: config.policy.ingress_discard_entries()?,
        local_net_rules: config.policy.local_net_rules()?,
        local_net_blocked_uids: config.policy.local_network.blocked_uids.clone(),
        blocked_ports: config.policy.blocked_ports.clone(),
        clat_ingress,
        clat_egress,
    })
}

/// Create the maps, apply the configured policy and verify the startup
/// invariants.
pub fn build(config: AgentConfig) -> anyhow::Result<Agent> {
    let maps = NetMaps::new();
    let ports = MapPorts {
        configuration: maps.configuration.clone(),
        policy: maps.policy.clone(),
        stats: maps.stats.clone(),
        cookie_tags: maps.cookie_tag.clone(),
        clat: maps.clat.clone(),
        trace: maps.trace.clone(),
    };
    let metrics = Arc::new(AgentMetrics::new());
    let sockets = Arc::new(SocketTable::new());
    let env = config.environment;

    let policy = PolicyAppService::new(ports.clone(), metrics.clone());
    policy.apply(&snapshot(&config)?)?;
    check_invariants(maps.configuration.as_ref(), &config)?;

    info!(
        uid_rules = config.policy.uid_rules.len(),
        clat_sessions = config.clat.sessions.len(),
        generation = config.accounting.active_generation.as_str(),
        "maps populated"
    );

    Ok(Agent {
        traffic: TrafficAppService::new(env, ports.clone(), metrics.clone()),
        socket_hooks: SocketHookAppService::new(ports.clone(), metrics.clone()),
        tagging: TagAppService::new(
            TagPolicy::new(env, config.accounting.tag_quota()),
            ports.clone(),
            sockets.clone(),
            metrics.clone(),
        ),
        clat: ClatAppService::new(env, ports.clat.clone(), metrics.clone()),
        policy,
        config,
        maps,
        sockets,
        metrics,
    })
}

/// The hooks fall back to defaults when a slot is unreadable; at startup
/// that is treated as fatal instead.
pub fn check_invariants(
    configuration: &dyn ConfigurationMapPort,
    config: &AgentConfig,
) -> anyhow::Result<()> {
    if configuration
        .configuration(UID_RULES_CONFIGURATION_KEY)
        .is_none()
    {
        bail!("uid rules configuration slot is missing");
    }
    let Some(selector) = configuration.configuration(CURRENT_STATS_MAP_CONFIGURATION_KEY) else {
        bail!("stats map selector slot is missing");
    };
    if CounterGeneration::from_config(selector).is_none() {
        bail!("stats map selector holds invalid value {selector}");
    }
    config
        .accounting
        .tag_quota()
        .validate(STATS_MAP_SIZE)
        .context("tag quota does not fit the stats maps")?;
    Ok(())
}

/// Warn when the active generation is close to refusing new entries.
pub fn warn_if_stats_map_filling(agent: &Agent) -> anyhow::Result<()> {
    let generation = agent.policy.active_generation()?;
    let len = agent.maps.stats.generation_len(generation);
    let capacity = agent.maps.stats.stats_capacity();
    #[allow(clippy::cast_precision_loss)]
    let ratio = len as f32 / capacity as f32;
    if ratio > STATS_MAP_FILL_WARN_THRESHOLD {
        warn!(
            generation = generation.as_str(),
            entries = len,
            capacity,
            "active stats map is filling up, swap and drain it"
        );
    }
    Ok(())
}
