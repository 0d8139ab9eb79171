use anyhow::{Context, Result};
use infrastructure::config::AgentConfig;
use ports::secondary::trace_sink::PacketTraceSink;

use crate::cli::{OutputFormat, ReplayArgs};
use crate::replay::{self, ReplayOutcome};
use crate::startup::{self, Agent};

// ── Version ─────────────────────────────────────────────────────────────

pub fn cmd_version(output: OutputFormat) -> Result<()> {
    if output == OutputFormat::Json {
        let version = serde_json::json!({
            "name": "netguard-agent",
            "version": env!("CARGO_PKG_VERSION"),
        });
        println!("{}", serde_json::to_string_pretty(&version)?);
        return Ok(());
    }
    println!("netguard-agent {}", env!("CARGO_PKG_VERSION"));
    Ok(())
}

// ── Check ───────────────────────────────────────────────────────────────

pub fn cmd_check(config: AgentConfig, output: OutputFormat) -> Result<()> {
    let agent = startup::build(config)?;
    let generation = agent.policy.active_generation()?;
    let (ingress_sessions, egress_sessions) = agent.maps.clat.session_count();

    if output == OutputFormat::Json {
        let summary = serde_json::json!({
            "status": "ok",
            "kernel": agent.config.environment.kernel.to_string(),
            "sdk": agent.config.environment.sdk.as_str(),
            "active_generation": generation.as_str(),
            "uid_rules": agent.config.policy.uid_rules.len(),
            "clat_ingress_sessions": ingress_sessions,
            "clat_egress_sessions": egress_sessions,
            "per_uid_tag_limit": agent.config.accounting.per_uid_tag_limit,
            "total_tag_limit": agent.config.accounting.total_tag_limit,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Configuration OK");
    println!("  Kernel:             {}", agent.config.environment.kernel);
    println!("  SDK level:          {}", agent.config.environment.sdk);
    println!("  Active generation:  {}", generation.as_str());
    println!("  UID rules:          {}", agent.config.policy.uid_rules.len());
    println!("  Clat sessions:      {ingress_sessions} in / {egress_sessions} out");
    println!(
        "  Tag limits:         {} per UID, {} total",
        agent.config.accounting.per_uid_tag_limit, agent.config.accounting.total_tag_limit
    );
    Ok(())
}

// ── Replay ──────────────────────────────────────────────────────────────

fn replay_into(agent: &Agent, args: &ReplayArgs) -> Result<Vec<ReplayOutcome>> {
    let records = replay::read_records(&args.frames)?;
    let outcomes = replay::run(agent, records, args.hook)
        .with_context(|| format!("replay of {} aborted", args.frames.display()))?;
    startup::warn_if_stats_map_filling(agent)?;
    Ok(outcomes)
}

pub fn cmd_replay(config: AgentConfig, args: &ReplayArgs, output: OutputFormat) -> Result<()> {
    let agent = startup::build(config)?;
    let outcomes = replay_into(&agent, args)?;
    let traces = agent.maps.trace.drain(usize::MAX);

    if output == OutputFormat::Json {
        for outcome in &outcomes {
            println!("{}", serde_json::to_string(outcome)?);
        }
        return Ok(());
    }

    if outcomes.is_empty() {
        println!("No records replayed.");
        return Ok(());
    }

    println!(
        "{:>6}  {:<20}  {:<10}  {}",
        "LINE", "OPERATION", "RESULT", "DETAIL"
    );
    for o in &outcomes {
        println!(
            "{:>6}  {:<20}  {:<10}  {}",
            o.line,
            o.operation,
            o.result,
            o.detail.as_deref().unwrap_or("-"),
        );
    }
    println!(
        "\n{} record(s) replayed, {} trace event(s).",
        outcomes.len(),
        traces.len()
    );
    Ok(())
}

// ── Metrics ─────────────────────────────────────────────────────────────

pub fn cmd_metrics(config: AgentConfig, args: &ReplayArgs) -> Result<()> {
    let agent = startup::build(config)?;
    replay_into(&agent, args)?;
    let text = agent
        .metrics
        .encode()
        .context("failed to encode metrics")?;
    print!("{text}");
    Ok(())
}
