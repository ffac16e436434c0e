use cladeflow_bio::minimizer::FindBestDatasetsResult;
use std::collections::{BTreeMap, BTreeSet};

/// Which dataset each sequence is analyzed against
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetAssignment {
    /// Same dataset for every sequence
    Single(String),
    /// Dataset per input index, usually from autodetection. Indices without
    /// an entry fail individually.
    PerSequence(BTreeMap<usize, String>),
}

impl DatasetAssignment {
    pub fn dataset_for(&self, index: usize) -> Option<&str> {
        match self {
            DatasetAssignment::Single(name) => Some(name),
            DatasetAssignment::PerSequence(by_index) => by_index.get(&index).map(String::as_str),
        }
    }

    pub fn dataset_names(&self) -> BTreeSet<&str> {
        match self {
            DatasetAssignment::Single(name) => BTreeSet::from([name.as_str()]),
            DatasetAssignment::PerSequence(by_index) => by_index.values().map(String::as_str).collect(),
        }
    }
}

impl From<&str> for DatasetAssignment {
    fn from(name: &str) -> Self {
        DatasetAssignment::Single(name.to_string())
    }
}

impl From<String> for DatasetAssignment {
    fn from(name: String) -> Self {
        DatasetAssignment::Single(name)
    }
}

impl From<BTreeMap<usize, String>> for DatasetAssignment {
    fn from(by_index: BTreeMap<usize, String>) -> Self {
        DatasetAssignment::PerSequence(by_index)
    }
}

impl From<&FindBestDatasetsResult> for DatasetAssignment {
    fn from(best: &FindBestDatasetsResult) -> Self {
        DatasetAssignment::PerSequence(best.assignments())
    }
}
