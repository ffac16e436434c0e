//! Mock implementations for testing

mod analyzer;

pub use analyzer::{AnalyzerProbe, MockAnalyzer, MockAnalyzerConfig};
