use crate::cli::output::NdjsonWriter;
use crate::cli::progress::create_spinner;
use anyhow::Result;
use clap::Args;
use cladeflow::{source, AutodetectEvent, AutodetectOptions, AutodetectOrchestrator};
use cladeflow_bio::minimizer::{find_best_suggestion_for_seq, MinimizerIndex};
use cladeflow_core::Config;
use colored::*;
use serde_json::json;
use std::path::PathBuf;
use tokio::sync::mpsc;

#[derive(Args)]
pub struct AutodetectArgs {
    /// Minimizer index JSON
    #[arg(long, value_name = "FILE")]
    pub index: PathBuf,

    /// Input FASTA file, plain or gzipped
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Write NDJSON search records here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Keep every dataset above the thresholds, not just the top group
    #[arg(long)]
    pub all_matches: bool,
}

pub async fn run(args: AutodetectArgs, config: &Config) -> Result<()> {
    let index = MinimizerIndex::from_path(&args.index)?;
    let mut options = AutodetectOptions::from_config(config);
    options.search.all_matches |= args.all_matches;

    let mut orchestrator = AutodetectOrchestrator::new(index, options);
    let spinner = create_spinner("Searching minimizers...");
    let mut writer = NdjsonWriter::open(args.output.as_deref())?;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let handle = orchestrator.run(source::from_fasta_file(&args.input), tx).await?;

    while let Some(event) = rx.recv().await {
        match event {
            AutodetectEvent::Result(record) => {
                writer.write(&json!({
                    "index": record.fasta_record.index,
                    "seqName": record.fasta_record.seq_name,
                    "result": record.result,
                }))?;
                spinner.set_message(format!("Searched {} sequences", writer.written()));
            }
            AutodetectEvent::Error(error) if !error.is_fatal() => {
                spinner.suspend(|| eprintln!("{} {}", "Warning:".yellow().bold(), error));
            }
            _ => {}
        }
    }

    let best = handle.wait().await;
    spinner.finish_and_clear();
    writer.finish()?;
    let best = best?;

    let unmatched = best
        .results
        .keys()
        .filter(|&&index| find_best_suggestion_for_seq(&best, index).is_none())
        .count();

    eprintln!("{}", "Suggested datasets".bold());
    if best.suggestions.is_empty() {
        eprintln!("  {}", "none".dimmed());
    }
    for suggestion in &best.suggestions {
        eprintln!("  {:<32} {} sequences", suggestion.name.cyan(), suggestion.n_hits);
    }
    if unmatched > 0 {
        eprintln!(
            "{} {} sequences matched no dataset",
            "Warning:".yellow().bold(),
            unmatched
        );
    }
    Ok(())
}
