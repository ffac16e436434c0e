//! Reference datasets: reference sequence, tree, QC settings and labels
//!
//! A dataset directory contains:
//!
//! ```text
//! reference.fasta   first record is the reference sequence
//! tree.json         Auspice v2 tree with nucleotide branch mutations
//! qc.json           optional, QC rule configuration
//! labels.json       optional, map of "A123T" to label names
//! ```

use crate::analyzer::DatasetParams;
use cladeflow_bio::formats::parse_fasta;
use cladeflow_bio::mutation::MutationLabels;
use cladeflow_bio::qc::QcConfig;
use cladeflow_bio::tree::{AuspiceTree, ReferenceTree};
use cladeflow_core::{CladeError, CladeResult};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

pub const REFERENCE_FILE: &str = "reference.fasta";
pub const TREE_FILE: &str = "tree.json";
pub const QC_FILE: &str = "qc.json";
pub const LABELS_FILE: &str = "labels.json";

/// Everything loaded for one dataset. Built once per run and read-only
/// afterwards.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub name: String,
    pub reference: String,
    /// The tree as shipped, handed to the analyzer for output-tree building
    pub tree_json: serde_json::Value,
    pub tree: ReferenceTree,
    pub qc_config: QcConfig,
    pub labels: MutationLabels,
}

impl Dataset {
    pub fn from_parts(
        name: impl Into<String>,
        reference: impl Into<String>,
        tree_json: &str,
        qc_config: QcConfig,
        labels: MutationLabels,
    ) -> CladeResult<Self> {
        let name = name.into();
        let reference = reference.into().to_ascii_uppercase();
        if reference.is_empty() {
            return Err(CladeError::Dataset(format!("Dataset '{}' has an empty reference", name)));
        }

        let tree_json: serde_json::Value = serde_json::from_str(tree_json)
            .map_err(|e| CladeError::Dataset(format!("Malformed tree JSON in '{}': {}", name, e)))?;
        let auspice: AuspiceTree = serde_json::from_value(tree_json.clone())
            .map_err(|e| CladeError::Dataset(format!("Malformed tree JSON in '{}': {}", name, e)))?;
        let tree = ReferenceTree::from_auspice(&auspice, &reference)?;

        Ok(Self {
            name,
            reference,
            tree_json,
            tree,
            qc_config,
            labels,
        })
    }

    /// Load a dataset directory. The directory name is the dataset name.
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> CladeResult<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(CladeError::Dataset(format!("Dataset directory not found: {}", dir.display())));
        }
        let name = dir
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| CladeError::Dataset(format!("Cannot name dataset at {}", dir.display())))?;

        let reference = parse_fasta(dir.join(REFERENCE_FILE))?
            .into_iter()
            .next()
            .ok_or_else(|| CladeError::Dataset(format!("{} of '{}' has no records", REFERENCE_FILE, name)))?
            .seq;

        let tree_json = read_required(dir, TREE_FILE, &name)?;

        let qc_path = dir.join(QC_FILE);
        let qc_config = if qc_path.exists() {
            QcConfig::from_path(&qc_path)?
        } else {
            QcConfig::default()
        };

        let labels_path = dir.join(LABELS_FILE);
        let labels = if labels_path.exists() {
            let map: BTreeMap<String, Vec<String>> = serde_json::from_str(&std::fs::read_to_string(&labels_path)?)
                .map_err(|e| CladeError::Dataset(format!("Invalid {} in '{}': {}", LABELS_FILE, name, e)))?;
            MutationLabels::from_map(&map)?
        } else {
            MutationLabels::default()
        };

        let dataset = Self::from_parts(name, reference, &tree_json, qc_config, labels)?;
        info!(
            "Loaded dataset '{}' ({} bases, {} tree nodes)",
            dataset.name,
            dataset.reference.len(),
            dataset.tree.len()
        );
        Ok(dataset)
    }

    pub fn to_params(&self) -> DatasetParams {
        DatasetParams {
            name: self.name.clone(),
            reference: self.reference.clone(),
            tree: self.tree_json.clone(),
        }
    }
}

fn read_required(dir: &Path, file: &str, dataset: &str) -> CladeResult<String> {
    let path = dir.join(file);
    std::fs::read_to_string(&path)
        .map_err(|e| CladeError::Dataset(format!("Cannot read {} of '{}': {}", file, dataset, e)))
}
