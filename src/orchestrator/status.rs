use cladeflow_core::CladeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Lifecycle of one run. Moves forward only; `Failed` is reachable from
/// `InitializingUnits` and `Running`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GlobalStatus {
    #[default]
    Idle,
    InitializingUnits,
    Running,
    Aggregating,
    Done,
    Failed,
}

impl GlobalStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, GlobalStatus::Done | GlobalStatus::Failed)
    }
}

impl fmt::Display for GlobalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GlobalStatus::Idle => "idle",
            GlobalStatus::InitializingUnits => "initializing units",
            GlobalStatus::Running => "running",
            GlobalStatus::Aggregating => "aggregating",
            GlobalStatus::Done => "done",
            GlobalStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Errors reported while a run is in progress
#[derive(Error, Debug)]
pub enum RunError {
    /// The whole run was aborted
    #[error("{0}")]
    Fatal(CladeError),

    /// One sequence failed; the rest of the run continues
    #[error("Sequence {index} ('{seq_name}'): {error}")]
    Sequence {
        index: usize,
        seq_name: String,
        error: CladeError,
    },

    /// The output tree of one dataset could not be built
    #[error("Output tree of '{dataset_name}': {error}")]
    Tree { dataset_name: String, error: CladeError },
}

impl RunError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, RunError::Fatal(_))
    }

    pub fn index(&self) -> Option<usize> {
        match self {
            RunError::Sequence { index, .. } => Some(*index),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    /// Records read from the source
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Dataset facts published once the units are ready
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialData {
    pub dataset_name: String,
    pub reference_length: usize,
    pub tree_nodes: usize,
    pub clades: Vec<String>,
}
