use std::fs::File;
use std::io::{self, BufReader};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use callinsight_cli::commands::replay::ReplayOptions;
use callinsight_cli::commands::{classify, replay};
use callinsight_cli::{Cli, Commands, Config};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Logs go to stderr so the replay transcript on stdout stays clean
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    match &cli.command {
        Some(Commands::Replay {
            file,
            history,
            deny_overlay,
        }) => {
            let config = Config::load_from(cli.config.as_deref())
                .context("failed to load configuration")?;
            tracing::debug!(?config, "loaded configuration");

            let options = ReplayOptions {
                history: history.clone(),
                deny_overlay: *deny_overlay,
            };
            let stdout = io::stdout().lock();
            let summary = match file {
                Some(path) => {
                    let input = File::open(path)
                        .with_context(|| format!("failed to open {}", path.display()))?;
                    replay::run(BufReader::new(input), stdout, &config, &options)?
                }
                None => replay::run(io::stdin().lock(), stdout, &config, &options)?,
            };
            tracing::debug!(?summary, "replay finished");
        }
        Some(Commands::Classify { token }) => {
            classify::run(token, io::stdout().lock())?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
