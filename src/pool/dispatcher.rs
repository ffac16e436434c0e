//! FIFO dispatch of queued tasks onto idle units

use super::task::{Settle, Task};
use super::unit::UnitHandle;
use super::PoolState;
use cladeflow_core::CladeError;
use crossbeam::channel::Receiver;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{oneshot, watch};
use tracing::{debug, trace, warn};

pub(crate) enum Command<S> {
    Submit(Task<S>),
    /// Bypasses the queue, used to address every unit once
    Pinned {
        unit: usize,
        task: Task<S>,
    },
    Settled {
        unit: usize,
        task_id: u64,
    },
    UnitFailed {
        unit: usize,
    },
    Terminate {
        force: bool,
        ack: oneshot::Sender<()>,
    },
}

pub(crate) struct Dispatcher<S> {
    commands: Receiver<Command<S>>,
    units: Vec<UnitHandle<S>>,
    pending: Vec<usize>,
    alive: Vec<bool>,
    concurrency_per_unit: usize,
    queue: VecDeque<Task<S>>,
    in_flight: HashMap<u64, Arc<dyn Settle>>,
    state: Arc<watch::Sender<PoolState>>,
}

impl<S> Dispatcher<S> {
    pub(crate) fn new(
        commands: Receiver<Command<S>>,
        units: Vec<UnitHandle<S>>,
        concurrency_per_unit: usize,
        state: Arc<watch::Sender<PoolState>>,
    ) -> Self {
        let n = units.len();
        Self {
            commands,
            units,
            pending: vec![0; n],
            alive: vec![true; n],
            concurrency_per_unit,
            queue: VecDeque::new(),
            in_flight: HashMap::new(),
            state,
        }
    }

    pub(crate) fn run(mut self) {
        while let Ok(command) = self.commands.recv() {
            match command {
                Command::Submit(task) if !self.any_alive() => {
                    task.reject(CladeError::Pool("No execution unit is available".to_string()));
                    self.finish(1);
                }
                Command::Submit(task) => {
                    self.queue.push_back(task);
                    self.dispatch();
                }
                Command::Pinned { unit, task } => self.send_to(unit, task),
                Command::Settled { unit, task_id } => {
                    if self.in_flight.remove(&task_id).is_some() {
                        if let Some(pending) = self.pending.get_mut(unit) {
                            *pending = pending.saturating_sub(1);
                        }
                        self.finish(1);
                    }
                    self.dispatch();
                }
                Command::UnitFailed { unit } => {
                    if let Some(alive) = self.alive.get_mut(unit) {
                        *alive = false;
                    }
                    if !self.any_alive() {
                        warn!("No execution unit is available, rejecting {} queued tasks", self.queue.len());
                        self.reject_queued(|| CladeError::Pool("No execution unit is available".to_string()));
                    }
                }
                Command::Terminate { force, ack } => {
                    self.shutdown(force);
                    let _ = ack.send(());
                    return;
                }
            }
        }

        // Every sender is gone, which only happens if the pool vanished
        // without terminating.
        self.shutdown(true);
    }

    /// Move queue heads onto units with spare capacity, least loaded first.
    fn dispatch(&mut self) {
        while !self.queue.is_empty() {
            let Some(unit) = self.idle_unit() else {
                return;
            };
            let Some(task) = self.queue.pop_front() else {
                return;
            };
            self.send_to(unit, task);
        }
    }

    fn any_alive(&self) -> bool {
        self.alive.iter().any(|&a| a)
    }

    fn idle_unit(&self) -> Option<usize> {
        (0..self.units.len())
            .filter(|&i| self.alive[i] && self.pending[i] < self.concurrency_per_unit)
            .min_by_key(|&i| self.pending[i])
    }

    fn send_to(&mut self, unit: usize, task: Task<S>) {
        let task_id = task.id;
        let slot = Arc::clone(&task.slot);

        let Some(handle) = self.units.get(unit).filter(|_| self.alive[unit]) else {
            task.reject(CladeError::Pool(format!("Execution unit {} is unavailable", unit)));
            self.finish(1);
            return;
        };

        if handle.send(task) {
            trace!("Task {} dispatched to unit {}", task_id, unit);
            self.pending[unit] += 1;
            self.in_flight.insert(task_id, slot);
        } else {
            self.alive[unit] = false;
            self.finish(1);
        }
    }

    fn reject_queued(&mut self, error: impl Fn() -> CladeError) {
        let rejected = self.queue.len();
        for task in self.queue.drain(..) {
            task.reject(error());
        }
        self.finish(rejected);
    }

    fn finish(&self, settled: usize) {
        self.state
            .send_modify(|state| state.outstanding = state.outstanding.saturating_sub(settled));
    }

    fn shutdown(&mut self, force: bool) {
        let queued = self.queue.len();
        let in_flight = self.in_flight.len();
        self.reject_queued(|| CladeError::Cancelled);

        if force {
            for (_, slot) in self.in_flight.drain() {
                slot.reject(CladeError::Cancelled);
            }
        }

        for unit in &self.units {
            unit.shutdown();
        }
        for unit in &mut self.units {
            if force {
                unit.detach();
            } else {
                unit.join();
            }
        }

        self.in_flight.clear();
        self.state.send_modify(|state| {
            state.outstanding = 0;
            state.terminated = true;
        });
        debug!(
            "Pool shut down (force: {}, queued: {}, in flight: {})",
            force, queued, in_flight
        );
    }
}
