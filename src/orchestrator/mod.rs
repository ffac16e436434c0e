//! Streaming analysis runs
//!
//! A run reads records from a source, queues one analyzer task per record on
//! an [`ExecutionPool`], places and QCs each raw result as it comes back and
//! reports it right away. Results therefore arrive in completion order;
//! `index` is the key for restoring input order. Once the source is drained
//! and the pool is idle, one more task per dataset builds the output tree.

mod assignment;
mod callbacks;
mod result;
mod status;

pub use assignment::DatasetAssignment;
pub use callbacks::{AnalysisCallbacks, AnalysisEvent, OutputTrees};
pub use result::AnalysisResult;
pub use status::{GlobalStatus, InitialData, RunError, RunSummary};

use crate::analyzer::{AnalyzerUnit, DatasetParams, NativeAnalyzer};
use crate::dataset::Dataset;
use crate::pool::ExecutionPool;
use crate::source::SequenceStream;
use cladeflow_core::{CladeError, CladeResult, Config, FastaRecord, PoolConfig};
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, error, info, warn};

pub type AnalyzerFactory<A> = Arc<dyn Fn() -> CladeResult<A> + Send + Sync>;

type UnitPool<A> = ExecutionPool<AnalyzerUnit<A>>;

#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    pub pool: PoolConfig,
    /// Records dispatched but not yet reported; reading pauses at this limit
    pub max_pending_tasks: usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl AnalysisOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            pool: config.pool.clone(),
            max_pending_tasks: config.analysis.max_pending_tasks,
        }
    }
}

pub(crate) struct ActiveRun<S: 'static> {
    pub(crate) pool: Arc<ExecutionPool<S>>,
    pub(crate) driver: AbortHandle,
}

impl<S: 'static> ActiveRun<S> {
    pub(crate) async fn cancel(self) {
        self.driver.abort();
        self.pool.terminate(true).await;
    }
}

/// Runs analyses over a fixed set of datasets, one run at a time.
pub struct AnalysisOrchestrator<A: NativeAnalyzer> {
    datasets: BTreeMap<String, Arc<Dataset>>,
    factory: AnalyzerFactory<A>,
    options: AnalysisOptions,
    active: Option<ActiveRun<AnalyzerUnit<A>>>,
}

impl<A: NativeAnalyzer> AnalysisOrchestrator<A> {
    pub fn new<F>(datasets: Vec<Dataset>, factory: F, options: AnalysisOptions) -> Self
    where
        F: Fn() -> CladeResult<A> + Send + Sync + 'static,
    {
        Self {
            datasets: datasets
                .into_iter()
                .map(|dataset| (dataset.name.clone(), Arc::new(dataset)))
                .collect(),
            factory: Arc::new(factory),
            options,
            active: None,
        }
    }

    pub fn dataset_names(&self) -> Vec<&str> {
        self.datasets.keys().map(String::as_str).collect()
    }

    /// Pool of the current run, if one was started.
    pub fn active_pool(&self) -> Option<Arc<UnitPool<A>>> {
        self.active.as_ref().map(|run| Arc::clone(&run.pool))
    }

    /// Force-stop the current run. Its pending tasks resolve as cancelled
    /// and are never reported.
    pub async fn cancel(&mut self) {
        if let Some(run) = self.active.take() {
            info!("Cancelling previous analysis run");
            run.cancel().await;
        }
    }

    /// Start a run. A run still in progress is cancelled first, so at most
    /// one pool exists per orchestrator.
    ///
    /// Setup errors (unknown dataset, pool creation) are reported through
    /// `callbacks` and returned. Later fatal errors surface through
    /// `callbacks` and [`RunHandle::wait`].
    pub async fn run<C>(
        &mut self,
        assignment: impl Into<DatasetAssignment>,
        source: SequenceStream,
        mut callbacks: C,
    ) -> CladeResult<RunHandle>
    where
        C: AnalysisCallbacks,
    {
        self.cancel().await;

        let (status_tx, status_rx) = watch::channel(GlobalStatus::Idle);
        let mut reporter = StatusReporter {
            callbacks: &mut callbacks,
            status: &status_tx,
        };
        reporter.set(GlobalStatus::InitializingUnits);

        let assignment = assignment.into();
        let setup = self
            .select_datasets(&assignment)
            .and_then(|datasets| Ok((self.create_pool()?, datasets)));
        let (pool, datasets) = match setup {
            Ok(setup) => setup,
            Err(e) => {
                reporter.fail(&e);
                return Err(e);
            }
        };

        let pool = Arc::new(pool);
        let driver = Driver {
            pool: Arc::clone(&pool),
            datasets,
            assignment,
            options: self.options.clone(),
            callbacks,
            status: status_tx,
        };
        let join = tokio::spawn(driver.run(source));

        self.active = Some(ActiveRun {
            pool,
            driver: join.abort_handle(),
        });

        Ok(RunHandle::new(join, status_rx))
    }

    fn select_datasets(&self, assignment: &DatasetAssignment) -> CladeResult<BTreeMap<String, Arc<Dataset>>> {
        let names = assignment.dataset_names();
        if names.is_empty() {
            return Err(CladeError::Dataset("No dataset selected for this run".to_string()));
        }
        names
            .into_iter()
            .map(|name| {
                self.datasets
                    .get(name)
                    .map(|dataset| (name.to_string(), Arc::clone(dataset)))
                    .ok_or_else(|| CladeError::Dataset(format!("Dataset '{}' is not loaded", name)))
            })
            .collect()
    }

    fn create_pool(&self) -> CladeResult<UnitPool<A>> {
        let factory = Arc::clone(&self.factory);
        ExecutionPool::from_config(&self.options.pool, move |unit_id| {
            Ok(AnalyzerUnit::new(unit_id, factory()?))
        })
    }
}

/// Handle of a started run
pub struct RunHandle<T = RunSummary> {
    join: JoinHandle<CladeResult<T>>,
    status: watch::Receiver<GlobalStatus>,
}

impl<T> RunHandle<T> {
    pub(crate) fn new(join: JoinHandle<CladeResult<T>>, status: watch::Receiver<GlobalStatus>) -> Self {
        Self { join, status }
    }

    pub fn status(&self) -> GlobalStatus {
        *self.status.borrow()
    }

    /// Wait for the run to end. A run cancelled by a newer one returns
    /// [`CladeError::Cancelled`].
    pub async fn wait(self) -> CladeResult<T> {
        match self.join.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(CladeError::Cancelled),
            Err(e) => Err(CladeError::Other(format!("Run driver failed: {}", e))),
        }
    }
}

struct StatusReporter<'a, C: AnalysisCallbacks> {
    callbacks: &'a mut C,
    status: &'a watch::Sender<GlobalStatus>,
}

impl<C: AnalysisCallbacks> StatusReporter<'_, C> {
    fn set(&mut self, status: GlobalStatus) {
        info!("Analysis status: {}", status);
        self.status.send_replace(status);
        self.callbacks.on_global_status(status);
    }

    fn fail(&mut self, e: &CladeError) {
        error!("Analysis failed: {}", e);
        self.set(GlobalStatus::Failed);
        self.callbacks.on_error(RunError::Fatal(clone_error(e)));
    }
}

/// `CladeError` is not `Clone`; fatal errors are both reported and returned.
pub(crate) fn clone_error(e: &CladeError) -> CladeError {
    match e {
        CladeError::Dataset(s) => CladeError::Dataset(s.clone()),
        CladeError::Analysis(s) => CladeError::Analysis(s.clone()),
        CladeError::Serialization(s) => CladeError::Serialization(s.clone()),
        CladeError::Pool(s) => CladeError::Pool(s.clone()),
        CladeError::Timeout(s) => CladeError::Timeout(s.clone()),
        CladeError::Configuration(s) => CladeError::Configuration(s.clone()),
        CladeError::Parse(s) => CladeError::Parse(s.clone()),
        CladeError::Cancelled => CladeError::Cancelled,
        other => CladeError::Other(other.to_string()),
    }
}

struct SequenceOutcome {
    index: usize,
    seq_name: String,
    result: CladeResult<AnalysisResult>,
}

struct Driver<A: NativeAnalyzer, C: AnalysisCallbacks> {
    pool: Arc<UnitPool<A>>,
    datasets: BTreeMap<String, Arc<Dataset>>,
    assignment: DatasetAssignment,
    options: AnalysisOptions,
    callbacks: C,
    status: watch::Sender<GlobalStatus>,
}

impl<A: NativeAnalyzer, C: AnalysisCallbacks> Driver<A, C> {
    fn reporter(&mut self) -> StatusReporter<'_, C> {
        StatusReporter {
            callbacks: &mut self.callbacks,
            status: &self.status,
        }
    }

    async fn run(mut self, source: SequenceStream) -> CladeResult<RunSummary> {
        if let Err(e) = self.initialize_units().await {
            self.pool.terminate(true).await;
            self.reporter().fail(&e);
            return Err(e);
        }

        for dataset in self.datasets.values() {
            let mut clades: Vec<String> = dataset.tree.iter().filter_map(|n| n.clade.clone()).collect();
            clades.sort();
            clades.dedup();
            self.callbacks.on_initial_data(InitialData {
                dataset_name: dataset.name.clone(),
                reference_length: dataset.reference.len(),
                tree_nodes: dataset.tree.len(),
                clades,
            });
        }

        self.reporter().set(GlobalStatus::Running);
        let (summary, results) = match self.analyze_all(source).await {
            Ok(done) => done,
            Err(e) => {
                self.pool.terminate(true).await;
                self.reporter().fail(&e);
                return Err(e);
            }
        };

        // barrier: nothing of this run may still be queued or running
        self.pool.completed().await;
        self.reporter().set(GlobalStatus::Aggregating);

        let trees = self.build_output_trees(results).await;
        self.callbacks.on_tree(trees);

        self.pool.terminate(false).await;
        self.reporter().set(GlobalStatus::Done);
        self.callbacks.on_complete();
        info!(
            "Analysis done: {} sequences, {} succeeded, {} failed",
            summary.total, summary.succeeded, summary.failed
        );
        Ok(summary)
    }

    fn initialize_units(&self) -> impl Future<Output = CladeResult<()>> + Send + 'static {
        let pool = Arc::clone(&self.pool);
        let timeout = self.options.pool.init_timeout();
        let params: Arc<Vec<DatasetParams>> = Arc::new(self.datasets.values().map(|d| d.to_params()).collect());
        async move {
            pool.initialize(timeout, move |_, unit: &mut AnalyzerUnit<A>| {
                unit.analyzer().initialize(&params)
            })
            .await
        }
    }

    /// Dispatch every record and report results as they settle. Returns
    /// once the source is drained and every dispatched record is reported.
    async fn analyze_all(
        &mut self,
        mut source: SequenceStream,
    ) -> CladeResult<(RunSummary, BTreeMap<String, Vec<AnalysisResult>>)> {
        let max_pending = self.options.max_pending_tasks.max(1);
        let mut pending: FuturesUnordered<BoxFuture<'static, SequenceOutcome>> = FuturesUnordered::new();
        let mut results: BTreeMap<String, Vec<AnalysisResult>> = BTreeMap::new();
        let mut summary = RunSummary::default();
        let mut source_done = false;

        loop {
            tokio::select! {
                Some(outcome) = pending.next(), if !pending.is_empty() => {
                    self.report(outcome, &mut summary, &mut results);
                }
                item = source.next(), if !source_done && pending.len() < max_pending => match item {
                    Some(Ok(record)) => {
                        summary.total += 1;
                        pending.push(self.dispatch(record));
                    }
                    Some(Err(e)) => return Err(e),
                    None => {
                        debug!("Source drained after {} records", summary.total);
                        source_done = true;
                    }
                },
                else => break,
            }
        }

        Ok((summary, results))
    }

    fn dispatch(&self, record: FastaRecord) -> BoxFuture<'static, SequenceOutcome> {
        let index = record.index;
        let seq_name = record.seq_name.clone();

        let Some(dataset) = self
            .assignment
            .dataset_for(index)
            .and_then(|name| self.datasets.get(name))
            .cloned()
        else {
            let error = CladeError::Dataset("Unable to detect reference dataset".to_string());
            return futures::future::ready(SequenceOutcome {
                index,
                seq_name,
                result: Err(error),
            })
            .boxed();
        };

        let name = dataset.name.clone();
        let task = self
            .pool
            .queue(move |unit: &mut AnalyzerUnit<A>| unit.analyzer().analyze(&name, &record));
        debug!("Queued sequence {} ('{}')", index, seq_name);

        async move {
            let result = match task.await {
                Ok(raw) => AnalysisResult::build(index, seq_name.clone(), &dataset, raw),
                Err(e) => Err(e),
            };
            SequenceOutcome {
                index,
                seq_name,
                result,
            }
        }
        .boxed()
    }

    fn report(
        &mut self,
        outcome: SequenceOutcome,
        summary: &mut RunSummary,
        results: &mut BTreeMap<String, Vec<AnalysisResult>>,
    ) {
        match outcome.result {
            Ok(result) => {
                summary.succeeded += 1;
                results
                    .entry(result.dataset_name.clone())
                    .or_default()
                    .push(result.clone());
                self.callbacks.on_result(result);
            }
            Err(e) if e.is_cancelled() => {
                debug!("Sequence {} was cancelled", outcome.index);
            }
            Err(error) => {
                summary.failed += 1;
                warn!("Sequence {} ('{}') failed: {}", outcome.index, outcome.seq_name, error);
                self.callbacks.on_error(RunError::Sequence {
                    index: outcome.index,
                    seq_name: outcome.seq_name,
                    error,
                });
            }
        }
    }

    async fn build_output_trees(&mut self, mut results: BTreeMap<String, Vec<AnalysisResult>>) -> OutputTrees {
        let mut trees = OutputTrees::new();
        let names: Vec<String> = self.datasets.keys().cloned().collect();

        for name in names {
            let mut dataset_results = results.remove(&name).unwrap_or_default();
            dataset_results.sort_by_key(|r| r.index);

            let tree = match serde_json::to_string(&dataset_results) {
                Ok(serialized) => {
                    let dataset_name = name.clone();
                    self.pool
                        .queue(move |unit: &mut AnalyzerUnit<A>| {
                            unit.analyzer().output_tree(&dataset_name, &serialized)
                        })
                        .await
                }
                Err(e) => Err(e.into()),
            };

            match tree {
                Ok(tree) => {
                    trees.insert(name, Some(tree));
                }
                Err(error) => {
                    warn!("Output tree of '{}' failed: {}", name, error);
                    trees.insert(name.clone(), None);
                    self.callbacks.on_error(RunError::Tree {
                        dataset_name: name,
                        error,
                    });
                }
            }
        }

        trees
    }
}
