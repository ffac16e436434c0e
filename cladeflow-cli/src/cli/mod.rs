pub mod commands;
pub mod output;
pub mod progress;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "cladeflow",
    version,
    about = "Streaming clade assignment, mutation calling and QC for viral genomes",
    long_about = "cladeflow streams sequences through a pool of analyzer units, places each \
                  one on the phylogeny of its reference dataset and scores it with quality \
                  control rules. It can also suggest the dataset that fits each sequence."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Number of execution units (0 = configured value, default one per CPU)
    #[arg(short = 'j', long, default_value = "0", global = true)]
    pub threads: usize,

    /// TOML configuration file
    #[arg(short, long, value_name = "FILE", global = true, env = "CLADEFLOW_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze sequences against one or more reference datasets
    Run(commands::run::RunArgs),

    /// Suggest the best reference dataset for each sequence
    Autodetect(commands::autodetect::AutodetectArgs),
}
