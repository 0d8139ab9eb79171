use std::path::PathBuf;

use application::hook::Hook;
use clap::{Args, Parser, Subcommand, ValueEnum};
use infrastructure::config::{LogFormat, LogLevel};
use infrastructure::constants::DEFAULT_CONFIG_PATH;

#[derive(Parser, Debug)]
#[command(
    name = "netguard-agent",
    about = "Per-UID packet firewall, traffic accounting and 464XLAT agent",
    version = env!("CARGO_PKG_VERSION"),
)]
pub struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH, env = "NETGUARD_CONFIG", global = true)]
    pub config: String,

    /// Log level override (takes precedence over config file)
    #[arg(short, long, global = true)]
    pub log_level: Option<LogLevel>,

    /// Log format: json (default, production) or text (development)
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,

    /// Output format
    #[arg(short, long, default_value = "table", global = true)]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table (default)
    Table,
    /// One JSON document per result
    Json,
}

/// Replay input shared by `replay` and `metrics`.
#[derive(Args, Debug, Clone)]
pub struct ReplayArgs {
    /// JSON-lines file of replay records
    #[arg(short, long)]
    pub frames: PathBuf,

    /// Hook for frame records that do not name one
    #[arg(long)]
    pub hook: Option<Hook>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Display version and build information
    Version,

    /// Load the configuration, populate the maps and verify startup invariants
    Check,

    /// Run recorded frames and socket calls through the hooks
    Replay(ReplayArgs),

    /// Replay quietly, then print the Prometheus metrics
    Metrics(ReplayArgs),
}

pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_version() {
        let cli = Cli::try_parse_from(["netguard-agent", "version"]).unwrap();
        assert!(matches!(cli.command, Command::Version));
        assert_eq!(cli.config, DEFAULT_CONFIG_PATH);
        assert_eq!(cli.output, OutputFormat::Table);
    }

    #[test]
    fn cli_subcommand_required() {
        assert!(Cli::try_parse_from(["netguard-agent"]).is_err());
    }

    #[test]
    fn cli_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "netguard-agent",
            "check",
            "--config",
            "/tmp/netguard.yaml",
            "--log-level",
            "debug",
            "--log-format",
            "text",
            "-o",
            "json",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::Check));
        assert_eq!(cli.config, "/tmp/netguard.yaml");
        assert_eq!(cli.log_level, Some(LogLevel::Debug));
        assert_eq!(cli.log_format, Some(LogFormat::Text));
        assert_eq!(cli.output, OutputFormat::Json);
    }

    #[test]
    fn cli_replay_with_hook() {
        let cli = Cli::try_parse_from([
            "netguard-agent",
            "replay",
            "--frames",
            "capture.jsonl",
            "--hook",
            "cgroup_skb_egress",
        ])
        .unwrap();
        match cli.command {
            Command::Replay(args) => {
                assert_eq!(args.frames, PathBuf::from("capture.jsonl"));
                assert_eq!(args.hook, Some(Hook::CgroupSkbEgress));
            }
            other => panic!("expected Replay, got {other:?}"),
        }
    }

    #[test]
    fn cli_replay_requires_frames() {
        assert!(Cli::try_parse_from(["netguard-agent", "replay"]).is_err());
    }

    #[test]
    fn cli_unknown_hook_rejected() {
        assert!(
            Cli::try_parse_from(["netguard-agent", "metrics", "-f", "x", "--hook", "xdp"]).is_err()
        );
    }

    #[test]
    fn cli_invalid_log_level_rejected() {
        assert!(Cli::try_parse_from(["netguard-agent", "check", "-l", "loud"]).is_err());
    }
}
