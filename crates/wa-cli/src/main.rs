use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use wa_cli::commands::{collect, gaps, prefill, reconstruct, record, status};
use wa_cli::{Cli, Commands, Config};

fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Logs go to stderr so --json output stays parseable
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match &cli.command {
        Some(Commands::Record(args)) => {
            let config = load_config(cli.config.as_deref())?;
            record::run(&mut out, args, &config)?;
        }
        Some(Commands::Gaps(args)) => {
            let config = load_config(cli.config.as_deref())?;
            gaps::run(&mut out, args, &config)?;
        }
        Some(Commands::Collect(args)) => {
            let config = load_config(cli.config.as_deref())?;
            collect::run(&mut out, args, &config)?;
        }
        Some(Commands::Reconstruct(args)) => {
            let config = load_config(cli.config.as_deref())?;
            reconstruct::run(&mut out, args, &config)?;
        }
        Some(Commands::Prefill(args)) => {
            let config = load_config(cli.config.as_deref())?;
            prefill::run(&mut out, args, &config)?;
        }
        Some(Commands::Status) => {
            let config = load_config(cli.config.as_deref())?;
            status::run(&mut out, &config)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            writeln!(out)?;
        }
    }

    out.flush()?;
    Ok(())
}
