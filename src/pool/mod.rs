//! Bounded pool of isolated execution units
//!
//! Each unit is a dedicated thread owning one value of type `S`, built by
//! the pool's factory on that thread and dropped there on teardown. Nothing
//! is shared between units: a task is a closure moved into exactly one unit
//! and its result is moved back through a oneshot channel.
//!
//! A dispatcher thread owns the FIFO queue and hands the head of the queue
//! to the least loaded unit with spare capacity, so at most
//! `units * concurrency_per_unit` tasks are in flight at any time.

mod dispatcher;
mod task;
mod unit;

pub use task::TaskHandle;

use cladeflow_core::{CladeError, CladeResult, PoolConfig};
use crossbeam::channel::{self, Sender};
use dispatcher::{Command, Dispatcher};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use task::Task;
use tokio::sync::{oneshot, watch};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolState {
    /// Queued plus in-flight tasks
    pub outstanding: usize,
    pub terminated: bool,
}

pub struct ExecutionPool<S: 'static> {
    commands: Sender<Command<S>>,
    state: Arc<watch::Sender<PoolState>>,
    next_task_id: AtomicU64,
    closed: AtomicBool,
    unit_count: usize,
    concurrency_per_unit: usize,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl<S: 'static> ExecutionPool<S> {
    /// Start `unit_count` units, each running `factory(unit_id)` once on its
    /// own thread to build its state.
    ///
    /// A factory failure does not fail creation; the unit reports itself
    /// unavailable and is skipped by dispatch. Once no unit is left, queued
    /// and newly submitted tasks fail with [`CladeError::Pool`]. Use [`ExecutionPool::initialize`] to surface
    /// such failures before queueing work.
    pub fn create<F>(unit_count: usize, concurrency_per_unit: usize, factory: F) -> CladeResult<Self>
    where
        F: Fn(usize) -> CladeResult<S> + Send + Sync + 'static,
    {
        if unit_count == 0 {
            return Err(CladeError::Pool("Pool needs at least one execution unit".to_string()));
        }
        if concurrency_per_unit == 0 {
            return Err(CladeError::Pool("Concurrency per unit must be at least 1".to_string()));
        }

        let (commands, inbox) = channel::unbounded();
        let factory = Arc::new(factory);

        let units = (0..unit_count)
            .map(|id| unit::spawn_unit(id, Arc::clone(&factory), commands.clone()))
            .collect::<CladeResult<Vec<_>>>()?;

        let state = Arc::new(watch::Sender::new(PoolState::default()));
        let dispatcher = Dispatcher::new(inbox, units, concurrency_per_unit, Arc::clone(&state));
        let dispatcher = thread::Builder::new()
            .name("cladeflow-dispatch".to_string())
            .spawn(move || dispatcher.run())
            .map_err(|e| CladeError::Pool(format!("Failed to spawn dispatcher: {}", e)))?;

        info!(
            "Started execution pool with {} units ({} task(s) per unit)",
            unit_count, concurrency_per_unit
        );

        Ok(Self {
            commands,
            state,
            next_task_id: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            unit_count,
            concurrency_per_unit,
            dispatcher: Mutex::new(Some(dispatcher)),
        })
    }

    pub fn from_config<F>(config: &PoolConfig, factory: F) -> CladeResult<Self>
    where
        F: Fn(usize) -> CladeResult<S> + Send + Sync + 'static,
    {
        Self::create(config.resolved_units(), config.concurrency_per_unit, factory)
    }

    pub fn unit_count(&self) -> usize {
        self.unit_count
    }

    pub fn concurrency_per_unit(&self) -> usize {
        self.concurrency_per_unit
    }

    /// Append a task to the FIFO. Never blocks; the returned handle resolves
    /// once some unit has run the task.
    pub fn queue<R, F>(&self, f: F) -> TaskHandle<R>
    where
        F: FnOnce(&mut S) -> CladeResult<R> + Send + 'static,
        R: Send + 'static,
    {
        if self.closed.load(Ordering::SeqCst) {
            return TaskHandle::failed(CladeError::Cancelled);
        }
        let (task, handle) = Task::new(self.next_id(), f);
        self.submit(Command::Submit(task));
        handle
    }

    /// Run `f` once on every unit, bypassing the queue.
    pub fn for_each_unit<R, F>(&self, f: F) -> Vec<TaskHandle<R>>
    where
        F: Fn(usize, &mut S) -> CladeResult<R> + Send + Sync + 'static,
        R: Send + 'static,
    {
        let f = Arc::new(f);
        (0..self.unit_count)
            .map(|unit| {
                if self.closed.load(Ordering::SeqCst) {
                    return TaskHandle::failed(CladeError::Cancelled);
                }
                let f = Arc::clone(&f);
                let (task, handle) = Task::new(self.next_id(), move |state: &mut S| f(unit, state));
                self.submit(Command::Pinned { unit, task });
                handle
            })
            .collect()
    }

    /// [`for_each_unit`](Self::for_each_unit) under a deadline. Any unit
    /// failing or missing the deadline fails the whole call.
    pub async fn initialize<F>(&self, timeout: Duration, f: F) -> CladeResult<()>
    where
        F: Fn(usize, &mut S) -> CladeResult<()> + Send + Sync + 'static,
    {
        let handles = self.for_each_unit(f);
        let all = futures::future::try_join_all(handles.into_iter().enumerate().map(|(unit, handle)| async move {
            handle.await.map_err(|e| match e {
                CladeError::Cancelled => CladeError::Cancelled,
                e => CladeError::Pool(format!("Execution unit {} failed to initialize: {}", unit, e)),
            })
        }));

        match tokio::time::timeout(timeout, all).await {
            Ok(result) => {
                result?;
                debug!("Initialized {} execution units", self.unit_count);
                Ok(())
            }
            Err(_) => Err(CladeError::Timeout(format!(
                "execution units did not initialize within {:?}",
                timeout
            ))),
        }
    }

    /// Resolves once nothing is queued or in flight, or the pool is
    /// terminated.
    pub async fn completed(&self) {
        let mut rx = self.state.subscribe();
        let _ = rx
            .wait_for(|state| state.outstanding == 0 || state.terminated)
            .await;
    }

    pub fn state(&self) -> PoolState {
        *self.state.borrow()
    }

    pub fn is_terminated(&self) -> bool {
        self.state.borrow().terminated
    }

    /// Stop the pool. New tasks are refused from here on.
    ///
    /// With `force`, queued and in-flight tasks resolve to
    /// [`CladeError::Cancelled`] at once and units are released without
    /// waiting for them. Otherwise the queue is drained first and the unit
    /// threads are joined.
    pub async fn terminate(&self, force: bool) {
        self.closed.store(true, Ordering::SeqCst);
        if !force {
            self.completed().await;
        }

        let (ack, done) = oneshot::channel();
        if self.commands.send(Command::Terminate { force, ack }).is_ok() {
            let _ = done.await;
        }

        let dispatcher = self.dispatcher.lock().take();
        if let Some(dispatcher) = dispatcher {
            // The dispatcher has acknowledged or is already gone; joining
            // here is immediate.
            let _ = tokio::task::spawn_blocking(move || dispatcher.join()).await;
        }
    }

    fn next_id(&self) -> u64 {
        self.next_task_id.fetch_add(1, Ordering::Relaxed)
    }

    fn submit(&self, command: Command<S>) {
        self.state.send_modify(|state| state.outstanding += 1);
        if let Err(err) = self.commands.send(command) {
            if let Command::Submit(task) | Command::Pinned { task, .. } = err.0 {
                task.reject(CladeError::Cancelled);
            }
            self.state
                .send_modify(|state| state.outstanding = state.outstanding.saturating_sub(1));
        }
    }
}

impl<S: 'static> Drop for ExecutionPool<S> {
    fn drop(&mut self) {
        if !self.is_terminated() {
            let (ack, _) = oneshot::channel();
            let _ = self.commands.send(Command::Terminate { force: true, ack });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter_pool(units: usize) -> ExecutionPool<usize> {
        ExecutionPool::create(units, 1, |id| Ok(id * 100)).unwrap()
    }

    #[tokio::test]
    async fn test_queue_runs_on_unit_state() {
        let pool = counter_pool(1);
        let first = pool.queue(|state| {
            *state += 1;
            Ok(*state)
        });
        let second = pool.queue(|state| {
            *state += 1;
            Ok(*state)
        });
        assert_eq!(first.await.unwrap(), 1);
        assert_eq!(second.await.unwrap(), 2);
        pool.terminate(false).await;
    }

    #[tokio::test]
    async fn test_for_each_unit_reaches_every_unit() {
        let pool = counter_pool(3);
        let handles = pool.for_each_unit(|unit, state: &mut usize| Ok((unit, *state)));
        let mut seen = futures::future::join_all(handles)
            .await
            .into_iter()
            .collect::<CladeResult<Vec<_>>>()
            .unwrap();
        seen.sort();
        assert_eq!(seen, vec![(0, 0), (1, 100), (2, 200)]);
        pool.terminate(false).await;
    }

    #[tokio::test]
    async fn test_completed_waits_for_everything() {
        let pool = counter_pool(2);
        let done = Arc::new(AtomicUsize::new(0));
        for _ in 0..20 {
            let done = Arc::clone(&done);
            let _ = pool.queue(move |_| {
                std::thread::sleep(Duration::from_millis(2));
                done.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }
        pool.completed().await;
        assert_eq!(done.load(Ordering::SeqCst), 20);
        assert_eq!(pool.state().outstanding, 0);

        // still accepts work afterwards
        assert_eq!(pool.queue(|_| Ok(7)).await.unwrap(), 7);
        pool.terminate(false).await;
    }

    #[tokio::test]
    async fn test_failed_factory_is_reported_by_initialize() {
        let pool: ExecutionPool<()> = ExecutionPool::create(2, 1, |id| {
            if id == 1 {
                Err(CladeError::Analysis("no license".to_string()))
            } else {
                Ok(())
            }
        })
        .unwrap();

        let err = pool
            .initialize(Duration::from_secs(5), |_, _| Ok(()))
            .await
            .unwrap_err();
        assert!(matches!(err, CladeError::Pool(_)));
        pool.terminate(true).await;
    }

    #[tokio::test]
    async fn test_initialize_timeout() {
        let pool = counter_pool(1);
        let err = pool
            .initialize(Duration::from_millis(20), |_, _| {
                std::thread::sleep(Duration::from_millis(300));
                Ok(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CladeError::Timeout(_)));
        pool.terminate(true).await;
    }

    #[tokio::test]
    async fn test_queue_after_terminate_is_cancelled() {
        let pool = counter_pool(1);
        pool.terminate(false).await;
        assert!(pool.is_terminated());
        assert!(pool.queue(|_| Ok(())).await.unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn test_queue_fails_once_every_unit_is_gone() {
        let pool: ExecutionPool<()> =
            ExecutionPool::create(2, 1, |_| Err(CladeError::Analysis("no license".to_string()))).unwrap();
        // both units report their failure before rejecting these
        let pinned = futures::future::join_all(pool.for_each_unit(|_, _| Ok(()))).await;
        assert!(pinned.iter().all(|outcome| outcome.is_err()));

        let outcome = tokio::time::timeout(Duration::from_secs(2), pool.queue(|_| Ok(1)))
            .await
            .expect("task never settled");
        assert!(matches!(outcome, Err(CladeError::Pool(_))));

        tokio::time::timeout(Duration::from_secs(2), pool.completed())
            .await
            .expect("pool never completed");
        assert_eq!(pool.state().outstanding, 0);
        pool.terminate(true).await;
    }

    #[tokio::test]
    async fn test_completed_resolves_after_terminate_with_late_submission() {
        let pool = counter_pool(1);
        pool.terminate(false).await;
        // a submission that slipped past the closed check
        pool.state.send_modify(|state| state.outstanding += 1);
        tokio::time::timeout(Duration::from_secs(2), pool.completed())
            .await
            .expect("completed hung after terminate");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_terminate_future_is_send() {
        let pool = Arc::new(counter_pool(1));
        let remote = Arc::clone(&pool);
        let value = tokio::spawn(async move {
            let value = remote.queue(|state| Ok(*state + 1)).await;
            remote.terminate(false).await;
            value
        })
        .await
        .unwrap()
        .unwrap();
        assert_eq!(value, 1);
        assert!(pool.is_terminated());
    }

    #[test]
    fn test_rejects_empty_pool() {
        assert!(ExecutionPool::<()>::create(0, 1, |_| Ok(())).is_err());
        assert!(ExecutionPool::<()>::create(1, 0, |_| Ok(())).is_err());
    }
}
