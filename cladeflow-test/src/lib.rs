//! Test utilities for the cladeflow workspace
//!
//! Shared fixtures (a toy dataset, generated records, a small minimizer
//! index) and a [`MockAnalyzer`] with injectable delays and failures. Only
//! integration tests depend on this crate.

pub mod fixtures;
pub mod mock;

pub use fixtures::{minimizer_fixture, toy_dataset, toy_records, MinimizerFixture, TOY_DATASET, TOY_REFERENCE};
pub use mock::{AnalyzerProbe, MockAnalyzer, MockAnalyzerConfig};

pub use tempfile;

/// Initialize test logging; repeated calls are ignored.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
