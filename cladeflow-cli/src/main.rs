use clap::Parser;
use colored::*;
use std::process;

mod cli;

use crate::cli::{Cli, Commands};
use cladeflow_core::logging::{init_logging, level_for_verbosity};
use cladeflow_core::{load_config, CladeError, Config};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{} {}", "Error:".red().bold(), e);

        let exit_code = match e.downcast_ref::<CladeError>() {
            Some(CladeError::Configuration(_)) => 2,
            Some(CladeError::Io(_)) => 3,
            Some(CladeError::Parse(_)) => 4,
            Some(CladeError::Dataset(_)) => 5,
            _ => 1,
        };
        process::exit(exit_code);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };
    if cli.threads > 0 {
        config.pool.units = cli.threads;
    }

    init_logging(&level_for_verbosity(cli.verbose, &config.logging.level));

    if cli.verbose > 0 {
        eprintln!("Using {} execution units", config.pool.resolved_units());
    }

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(async {
        match cli.command {
            Commands::Run(args) => crate::cli::commands::run::run(args, &config).await,
            Commands::Autodetect(args) => crate::cli::commands::autodetect::run(args, &config).await,
        }
    })
}
