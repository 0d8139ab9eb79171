#![forbid(unsafe_code)]

mod cli;
mod commands;
mod replay;
mod startup;

use anyhow::Result;

use cli::Command;

fn main() -> Result<()> {
    let cli = cli::parse();
    let output = cli.output;

    match &cli.command {
        Command::Version => commands::cmd_version(output),

        Command::Check => {
            let config = startup::init(&cli)?;
            commands::cmd_check(config, output)
        }

        Command::Replay(args) => {
            let config = startup::init(&cli)?;
            commands::cmd_replay(config, args, output)
        }

        Command::Metrics(args) => {
            let config = startup::init(&cli)?;
            commands::cmd_metrics(config, args)
        }
    }
}
