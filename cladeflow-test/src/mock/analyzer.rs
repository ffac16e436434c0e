//! Mock native analyzer
//!
//! Delegates the real work to [`NaiveAnalyzer`] and layers configurable
//! delays and failures on top. Every instance built from one config reports
//! into the same [`AnalyzerProbe`].

use cladeflow::analyzer::{DatasetParams, NaiveAnalyzer, NativeAnalyzer};
use cladeflow_core::{CladeError, CladeResult, FastaRecord, RawAnalysisResult};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Counters shared by every mock instance of one pool
#[derive(Debug, Default)]
pub struct AnalyzerProbe {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    analyze_calls: AtomicUsize,
    init_calls: AtomicUsize,
    destroy_calls: AtomicUsize,
    instances: AtomicUsize,
}

impl AnalyzerProbe {
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn analyze_calls(&self) -> usize {
        self.analyze_calls.load(Ordering::SeqCst)
    }

    pub fn init_calls(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }

    pub fn destroy_calls(&self) -> usize {
        self.destroy_calls.load(Ordering::SeqCst)
    }

    pub fn instances(&self) -> usize {
        self.instances.load(Ordering::SeqCst)
    }

    fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.analyze_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Configuration for mock analyzer behavior
#[derive(Debug, Clone, Default)]
pub struct MockAnalyzerConfig {
    /// Delay applied to every `analyze` call without a specific entry
    pub delay: Duration,
    /// Delay per sequence index
    pub delays: HashMap<usize, Duration>,
    /// Sequence indices whose analysis fails
    pub failing: HashSet<usize>,
    pub init_delay: Duration,
    pub fail_init: bool,
    pub fail_output_tree: bool,
    pub probe: Arc<AnalyzerProbe>,
}

impl MockAnalyzerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_delay_for(mut self, index: usize, delay: Duration) -> Self {
        self.delays.insert(index, delay);
        self
    }

    pub fn failing_on(mut self, index: usize) -> Self {
        self.failing.insert(index);
        self
    }

    pub fn with_init_delay(mut self, delay: Duration) -> Self {
        self.init_delay = delay;
        self
    }

    pub fn failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    pub fn failing_output_tree(mut self) -> Self {
        self.fail_output_tree = true;
        self
    }

    pub fn probe(&self) -> Arc<AnalyzerProbe> {
        Arc::clone(&self.probe)
    }

    /// Factory suitable for an orchestrator
    pub fn factory(&self) -> impl Fn() -> CladeResult<MockAnalyzer> + Send + Sync + 'static {
        let config = self.clone();
        move || Ok(MockAnalyzer::with_config(config.clone()))
    }
}

/// Mock analyzer for testing
pub struct MockAnalyzer {
    config: MockAnalyzerConfig,
    inner: NaiveAnalyzer,
}

impl MockAnalyzer {
    pub fn new() -> Self {
        Self::with_config(MockAnalyzerConfig::default())
    }

    pub fn with_config(config: MockAnalyzerConfig) -> Self {
        config.probe.instances.fetch_add(1, Ordering::SeqCst);
        Self {
            config,
            inner: NaiveAnalyzer::new(),
        }
    }
}

impl Default for MockAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeAnalyzer for MockAnalyzer {
    fn initialize(&mut self, params: &[DatasetParams]) -> CladeResult<()> {
        self.config.probe.init_calls.fetch_add(1, Ordering::SeqCst);
        thread::sleep(self.config.init_delay);
        if self.config.fail_init {
            return Err(CladeError::Analysis("Mock analyzer failed to initialize".to_string()));
        }
        self.inner.initialize(params)
    }

    fn analyze(&mut self, dataset_name: &str, record: &FastaRecord) -> CladeResult<RawAnalysisResult> {
        let probe = Arc::clone(&self.config.probe);
        probe.enter();
        let delay = self
            .config
            .delays
            .get(&record.index)
            .copied()
            .unwrap_or(self.config.delay);
        thread::sleep(delay);

        let result = if self.config.failing.contains(&record.index) {
            Err(CladeError::Analysis(format!("Mock failure for sequence {}", record.index)))
        } else {
            self.inner.analyze(dataset_name, record)
        };
        probe.leave();
        result
    }

    fn output_tree(&mut self, dataset_name: &str, serialized_results: &str) -> CladeResult<serde_json::Value> {
        if self.config.fail_output_tree {
            return Err(CladeError::Analysis(format!("Mock output tree failure for '{}'", dataset_name)));
        }
        self.inner.output_tree(dataset_name, serialized_results)
    }

    fn destroy(&mut self) {
        self.config.probe.destroy_calls.fetch_add(1, Ordering::SeqCst);
    }
}
