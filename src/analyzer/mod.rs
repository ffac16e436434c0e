//! Contract of the per-sequence analysis engine hosted by each unit

pub mod naive;

pub use naive::NaiveAnalyzer;

use cladeflow_core::{CladeResult, FastaRecord, RawAnalysisResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Everything an analyzer instance needs to know about one dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetParams {
    pub name: String,
    pub reference: String,
    /// Reference tree in its original JSON form
    pub tree: serde_json::Value,
}

/// Trait for native analyzers
///
/// One instance lives on each execution unit and is only ever touched from
/// that unit's thread, so implementations may keep unsynchronised state.
pub trait NativeAnalyzer: 'static {
    /// Load the datasets this instance will be asked about
    fn initialize(&mut self, params: &[DatasetParams]) -> CladeResult<()>;

    /// Align and call mutations for one sequence
    fn analyze(&mut self, dataset_name: &str, record: &FastaRecord) -> CladeResult<RawAnalysisResult>;

    /// Build the output tree of a dataset from its serialized analysis results
    fn output_tree(&mut self, dataset_name: &str, serialized_results: &str) -> CladeResult<serde_json::Value>;

    /// Release native resources. Called exactly once, on unit teardown.
    fn destroy(&mut self) {}
}

/// Unit state wrapping an analyzer so teardown always reaches `destroy`.
pub struct AnalyzerUnit<A: NativeAnalyzer> {
    unit_id: usize,
    analyzer: A,
}

impl<A: NativeAnalyzer> AnalyzerUnit<A> {
    pub fn new(unit_id: usize, analyzer: A) -> Self {
        Self { unit_id, analyzer }
    }

    pub fn unit_id(&self) -> usize {
        self.unit_id
    }

    pub fn analyzer(&mut self) -> &mut A {
        &mut self.analyzer
    }
}

impl<A: NativeAnalyzer> Drop for AnalyzerUnit<A> {
    fn drop(&mut self) {
        debug!("Destroying analyzer on unit {}", self.unit_id);
        self.analyzer.destroy();
    }
}
