//! Streaming orchestration for viral genome analysis
//!
//! Records from a [`source`] are dispatched to an [`ExecutionPool`] of
//! isolated units, each hosting a [`NativeAnalyzer`]. The
//! [`AnalysisOrchestrator`] places every raw result on the dataset's
//! reference tree, runs QC over it and streams the finished
//! [`AnalysisResult`] back through [`AnalysisCallbacks`]. The
//! [`AutodetectOrchestrator`] does the same with minimizer searches to
//! suggest which dataset fits each sequence.

pub mod analyzer;
pub mod autodetect;
pub mod dataset;
pub mod orchestrator;
pub mod pool;
pub mod source;

pub use analyzer::{AnalyzerUnit, DatasetParams, NaiveAnalyzer, NativeAnalyzer};
pub use autodetect::{AutodetectCallbacks, AutodetectEvent, AutodetectOptions, AutodetectOrchestrator};
pub use dataset::Dataset;
pub use orchestrator::{
    AnalysisCallbacks, AnalysisEvent, AnalysisOptions, AnalysisOrchestrator, AnalysisResult, DatasetAssignment,
    GlobalStatus, InitialData, OutputTrees, RunError, RunHandle, RunSummary,
};
pub use pool::{ExecutionPool, PoolState, TaskHandle};
pub use source::SequenceStream;

pub use cladeflow_core::{CladeError, CladeResult, Config, FastaRecord};
