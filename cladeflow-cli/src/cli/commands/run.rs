use crate::cli::output::NdjsonWriter;
use crate::cli::progress::create_spinner;
use anyhow::{Context, Result};
use clap::Args;
use cladeflow::{
    source, AnalysisEvent, AnalysisOptions, AnalysisOrchestrator, AutodetectOptions, AutodetectOrchestrator,
    Dataset, DatasetAssignment, NaiveAnalyzer,
};
use cladeflow_bio::minimizer::MinimizerIndex;
use cladeflow_core::{CladeError, Config};
use colored::*;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::info;

#[derive(Args)]
pub struct RunArgs {
    /// Dataset directory (repeat for several datasets)
    #[arg(short = 'd', long = "dataset", value_name = "DIR", required = true)]
    pub datasets: Vec<PathBuf>,

    /// Input FASTA file, plain or gzipped
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Write NDJSON results here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Write one `<dataset>.tree.json` per dataset into this directory
    #[arg(long, value_name = "DIR")]
    pub tree_dir: Option<PathBuf>,

    /// Pick the dataset of each sequence with this minimizer index instead
    /// of using the first dataset for everything
    #[arg(long, value_name = "FILE")]
    pub index: Option<PathBuf>,
}

pub async fn run(args: RunArgs, config: &Config) -> Result<()> {
    let datasets = args
        .datasets
        .iter()
        .map(Dataset::from_dir)
        .collect::<Result<Vec<_>, CladeError>>()?;

    let assignment = match &args.index {
        Some(index) => detect_datasets(index, &args.input, config).await?,
        // clap guarantees at least one dataset
        None => DatasetAssignment::Single(datasets[0].name.clone()),
    };

    if let Some(dir) = &args.tree_dir {
        std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    let mut orchestrator = AnalysisOrchestrator::new(
        datasets,
        || Ok(NaiveAnalyzer::new()),
        AnalysisOptions::from_config(config),
    );

    let spinner = create_spinner("Starting execution units...");
    let mut writer = NdjsonWriter::open(args.output.as_deref())?;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let handle = orchestrator
        .run(assignment, source::from_fasta_file(&args.input), tx)
        .await?;

    let mut failed = 0usize;
    while let Some(event) = rx.recv().await {
        match event {
            AnalysisEvent::GlobalStatus(status) => spinner.set_message(format!("Analysis {}", status)),
            AnalysisEvent::InitialData(data) => info!(
                "Dataset '{}': reference of {} bp, {} tree nodes",
                data.dataset_name, data.reference_length, data.tree_nodes
            ),
            AnalysisEvent::Result(result) => {
                writer.write(&result)?;
                spinner.set_message(format!("Analyzed {} sequences", writer.written()));
            }
            AnalysisEvent::Error(error) if error.is_fatal() => {}
            AnalysisEvent::Error(error) => {
                failed += 1;
                spinner.suspend(|| eprintln!("{} {}", "Warning:".yellow().bold(), error));
            }
            AnalysisEvent::Trees(trees) => {
                if let Some(dir) = &args.tree_dir {
                    for (name, tree) in trees {
                        if let Some(tree) = tree {
                            write_tree(dir, &name, &tree)?;
                        }
                    }
                }
            }
            AnalysisEvent::Complete => {}
        }
    }

    let summary = handle.wait().await;
    spinner.finish_and_clear();
    writer.finish()?;
    let summary = summary?;

    eprintln!(
        "{} {} sequences analyzed, {} succeeded, {} failed",
        "✓".green().bold(),
        summary.total,
        summary.succeeded.to_string().green(),
        if failed > 0 {
            failed.to_string().red()
        } else {
            failed.to_string().normal()
        }
    );
    Ok(())
}

async fn detect_datasets(index: &Path, input: &Path, config: &Config) -> Result<DatasetAssignment> {
    let spinner = create_spinner("Detecting datasets...");
    let index = MinimizerIndex::from_path(index)?;
    let mut orchestrator = AutodetectOrchestrator::new(index, AutodetectOptions::from_config(config));
    let handle = orchestrator.run(source::from_fasta_file(input), ()).await?;
    let best = handle.wait().await;
    spinner.finish_and_clear();
    let best = best?;

    for suggestion in &best.suggestions {
        eprintln!("  {} {} sequences", suggestion.name.cyan(), suggestion.n_hits);
    }
    Ok(DatasetAssignment::from(&best))
}

fn write_tree(dir: &Path, dataset_name: &str, tree: &serde_json::Value) -> Result<()> {
    let path = dir.join(format!("{}.tree.json", dataset_name));
    let text = serde_json::to_string_pretty(tree)?;
    std::fs::write(&path, text).with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Wrote output tree {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_tree_names_file_after_dataset() {
        let dir = TempDir::new().unwrap();
        write_tree(dir.path(), "flu", &serde_json::json!({"tree": {"name": "root"}})).unwrap();

        let written = std::fs::read_to_string(dir.path().join("flu.tree.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(value["tree"]["name"], "root");
    }
}
