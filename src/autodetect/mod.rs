//! Dataset autodetection runs
//!
//! Same dispatch model as [`crate::orchestrator`]: one minimizer search per
//! record on an [`ExecutionPool`], records reported as they complete. Once
//! the source is drained the per-sequence results are reduced to a set of
//! suggested datasets by [`find_best_datasets`].

use crate::orchestrator::{clone_error, ActiveRun, GlobalStatus, RunError, RunHandle};
use crate::pool::ExecutionPool;
use crate::source::SequenceStream;
use cladeflow_bio::minimizer::{
    find_best_datasets, run_minimizer_search, FindBestDatasetsResult, MinimizerIndex, MinimizerSearchRecord,
    MinimizerSearchResult,
};
use cladeflow_core::{AutodetectConfig, CladeError, CladeResult, Config, FastaRecord, PoolConfig};
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

/// Receiver of an autodetection run's output. Every method defaults to a no-op.
pub trait AutodetectCallbacks: Send + 'static {
    fn on_global_status(&mut self, _status: GlobalStatus) {}

    fn on_result(&mut self, _record: MinimizerSearchRecord) {}

    fn on_best_datasets(&mut self, _best: FindBestDatasetsResult) {}

    fn on_error(&mut self, _error: RunError) {}

    fn on_complete(&mut self) {}
}

impl AutodetectCallbacks for () {}

#[derive(Debug)]
pub enum AutodetectEvent {
    GlobalStatus(GlobalStatus),
    Result(Box<MinimizerSearchRecord>),
    BestDatasets(FindBestDatasetsResult),
    Error(RunError),
    Complete,
}

impl AutodetectCallbacks for mpsc::UnboundedSender<AutodetectEvent> {
    fn on_global_status(&mut self, status: GlobalStatus) {
        let _ = self.send(AutodetectEvent::GlobalStatus(status));
    }

    fn on_result(&mut self, record: MinimizerSearchRecord) {
        let _ = self.send(AutodetectEvent::Result(Box::new(record)));
    }

    fn on_best_datasets(&mut self, best: FindBestDatasetsResult) {
        let _ = self.send(AutodetectEvent::BestDatasets(best));
    }

    fn on_error(&mut self, error: RunError) {
        let _ = self.send(AutodetectEvent::Error(error));
    }

    fn on_complete(&mut self) {
        let _ = self.send(AutodetectEvent::Complete);
    }
}

#[derive(Debug, Clone)]
pub struct AutodetectOptions {
    pub pool: PoolConfig,
    pub search: AutodetectConfig,
    pub max_pending_tasks: usize,
}

impl Default for AutodetectOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl AutodetectOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            pool: config.pool.clone(),
            search: config.autodetect.clone(),
            max_pending_tasks: config.analysis.max_pending_tasks,
        }
    }
}

/// Unit state: a private copy of the index and the search thresholds
struct SearchUnit {
    index: MinimizerIndex,
    config: AutodetectConfig,
}

pub struct AutodetectOrchestrator {
    index: Arc<MinimizerIndex>,
    options: AutodetectOptions,
    active: Option<ActiveRun<SearchUnit>>,
}

impl AutodetectOrchestrator {
    pub fn new(index: MinimizerIndex, options: AutodetectOptions) -> Self {
        Self {
            index: Arc::new(index),
            options,
            active: None,
        }
    }

    pub fn index(&self) -> &MinimizerIndex {
        &self.index
    }

    pub fn is_active(&self) -> bool {
        self.active.as_ref().is_some_and(|run| !run.pool.is_terminated())
    }

    pub async fn cancel(&mut self) {
        if let Some(run) = self.active.take() {
            info!("Cancelling previous autodetection run");
            run.cancel().await;
        }
    }

    /// Start a run, cancelling the previous one. The handle resolves to the
    /// suggested datasets.
    pub async fn run<C>(
        &mut self,
        source: SequenceStream,
        mut callbacks: C,
    ) -> CladeResult<RunHandle<FindBestDatasetsResult>>
    where
        C: AutodetectCallbacks,
    {
        self.cancel().await;

        let (status_tx, status_rx) = watch::channel(GlobalStatus::Idle);
        set_status(&mut callbacks, &status_tx, GlobalStatus::InitializingUnits);

        let index = Arc::clone(&self.index);
        let search = self.options.search.clone();
        let pool = match ExecutionPool::from_config(&self.options.pool, move |_| {
            Ok(SearchUnit {
                index: index.as_ref().clone(),
                config: search.clone(),
            })
        }) {
            Ok(pool) => Arc::new(pool),
            Err(e) => {
                fail(&mut callbacks, &status_tx, &e);
                return Err(e);
            }
        };

        let driver = SearchDriver {
            pool: Arc::clone(&pool),
            dataset_order: self.index.dataset_names(),
            max_iter: self.options.search.max_iter,
            max_pending: self.options.max_pending_tasks.max(1),
            init_timeout: self.options.pool.init_timeout(),
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
}

fn set_status<C: AutodetectCallbacks>(callbacks: &mut C, tx: &watch::Sender<GlobalStatus>, status: GlobalStatus) {
    info!("Autodetect status: {}", status);
    tx.send_replace(status);
    callbacks.on_global_status(status);
}

fn fail<C: AutodetectCallbacks>(callbacks: &mut C, tx: &watch::Sender<GlobalStatus>, e: &CladeError) {
    error!("Autodetection failed: {}", e);
    set_status(callbacks, tx, GlobalStatus::Failed);
    callbacks.on_error(RunError::Fatal(clone_error(e)));
}

type SearchOutcome = (usize, String, CladeResult<MinimizerSearchRecord>);

struct SearchDriver<C: AutodetectCallbacks> {
    pool: Arc<ExecutionPool<SearchUnit>>,
    dataset_order: Vec<String>,
    max_iter: usize,
    max_pending: usize,
    init_timeout: std::time::Duration,
    callbacks: C,
    status: watch::Sender<GlobalStatus>,
}

impl<C: AutodetectCallbacks> SearchDriver<C> {
    async fn run(mut self, source: SequenceStream) -> CladeResult<FindBestDatasetsResult> {
        // surfaces unit construction failures before any record is read
        let pool = Arc::clone(&self.pool);
        if let Err(e) = pool.initialize(self.init_timeout, |_, _| Ok(())).await {
            self.abort(&e).await;
            return Err(e);
        }
        set_status(&mut self.callbacks, &self.status, GlobalStatus::Running);

        let results = match self.search_all(source).await {
            Ok(results) => results,
            Err(e) => {
                self.abort(&e).await;
                return Err(e);
            }
        };

        self.pool.completed().await;
        set_status(&mut self.callbacks, &self.status, GlobalStatus::Aggregating);

        let best = find_best_datasets(&results, &self.dataset_order, self.max_iter);
        for suggestion in &best.suggestions {
            info!(
                "Suggested dataset '{}' for {} sequence(s)",
                suggestion.name, suggestion.n_hits
            );
        }
        self.callbacks.on_best_datasets(best.clone());

        self.pool.terminate(false).await;
        set_status(&mut self.callbacks, &self.status, GlobalStatus::Done);
        self.callbacks.on_complete();
        Ok(best)
    }

    async fn abort(&mut self, e: &CladeError) {
        self.pool.terminate(true).await;
        fail(&mut self.callbacks, &self.status, e);
    }

    async fn search_all(
        &mut self,
        mut source: SequenceStream,
    ) -> CladeResult<BTreeMap<usize, MinimizerSearchResult>> {
        let mut pending: FuturesUnordered<BoxFuture<'static, SearchOutcome>> = FuturesUnordered::new();
        let mut results = BTreeMap::new();
        let mut source_done = false;

        loop {
            tokio::select! {
                Some((index, seq_name, outcome)) = pending.next(), if !pending.is_empty() => match outcome {
                    Ok(record) => {
                        results.insert(index, record.result.clone());
                        self.callbacks.on_result(record);
                    }
                    Err(e) if e.is_cancelled() => debug!("Search of sequence {} was cancelled", index),
                    Err(error) => {
                        warn!("Search of sequence {} ('{}') failed: {}", index, seq_name, error);
                        self.callbacks.on_error(RunError::Sequence { index, seq_name, error });
                    }
                },
                item = source.next(), if !source_done && pending.len() < self.max_pending => match item {
                    Some(Ok(record)) => pending.push(self.dispatch(record)),
                    Some(Err(e)) => return Err(e),
                    None => source_done = true,
                },
                else => break,
            }
        }

        Ok(results)
    }

    fn dispatch(&self, record: FastaRecord) -> BoxFuture<'static, SearchOutcome> {
        let index = record.index;
        let seq_name = record.seq_name.clone();
        let task = self.pool.queue(move |unit: &mut SearchUnit| {
            let result = run_minimizer_search(&record, &unit.index, &unit.config);
            Ok(MinimizerSearchRecord {
                fasta_record: record,
                result,
            })
        });
        async move { (index, seq_name, task.await) }.boxed()
    }
}
