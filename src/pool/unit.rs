//! Execution units: one OS thread owning one piece of state

use super::dispatcher::Command;
use super::task::Task;
use cladeflow_core::{CladeError, CladeResult};
use crossbeam::channel::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

pub(crate) enum UnitMessage<S> {
    Run(Task<S>),
    Shutdown,
}

/// Dispatcher-side handle of a unit.
pub(crate) struct UnitHandle<S> {
    pub(crate) id: usize,
    mailbox: Sender<UnitMessage<S>>,
    thread: Option<JoinHandle<()>>,
}

impl<S> UnitHandle<S> {
    /// Hand a task to the unit. A unit that is gone rejects it on the spot.
    pub(crate) fn send(&self, task: Task<S>) -> bool {
        match self.mailbox.send(UnitMessage::Run(task)) {
            Ok(()) => true,
            Err(err) => {
                if let UnitMessage::Run(task) = err.0 {
                    task.reject(CladeError::Pool(format!("Execution unit {} has stopped", self.id)));
                }
                false
            }
        }
    }

    pub(crate) fn shutdown(&self) {
        let _ = self.mailbox.send(UnitMessage::Shutdown);
    }

    pub(crate) fn join(&mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Execution unit {} panicked during shutdown", self.id);
            }
        }
    }

    /// Let the thread finish on its own; it drops its state when it sees
    /// the shutdown message.
    pub(crate) fn detach(&mut self) {
        self.thread.take();
    }
}

/// Start a unit thread. The state is built on the unit's own thread; if that
/// fails the unit reports itself dead and rejects everything it receives.
pub(crate) fn spawn_unit<S, F>(id: usize, factory: Arc<F>, commands: Sender<Command<S>>) -> CladeResult<UnitHandle<S>>
where
    S: 'static,
    F: Fn(usize) -> CladeResult<S> + Send + Sync + 'static,
{
    let (mailbox, inbox) = channel::unbounded();

    let thread = thread::Builder::new()
        .name(format!("cladeflow-unit-{}", id))
        .spawn(move || run_unit(id, factory.as_ref(), inbox, commands))
        .map_err(|e| CladeError::Pool(format!("Failed to spawn execution unit {}: {}", id, e)))?;

    Ok(UnitHandle {
        id,
        mailbox,
        thread: Some(thread),
    })
}

fn run_unit<S, F>(id: usize, factory: &F, inbox: Receiver<UnitMessage<S>>, commands: Sender<Command<S>>)
where
    F: Fn(usize) -> CladeResult<S>,
{
    let mut state = match factory(id) {
        Ok(state) => Some(state),
        Err(e) => {
            warn!("Execution unit {} failed to start: {}", id, e);
            let _ = commands.send(Command::UnitFailed { unit: id });
            None
        }
    };

    while let Ok(message) = inbox.recv() {
        match message {
            UnitMessage::Run(task) => {
                let task_id = task.id;
                match state.as_mut() {
                    Some(state) => (task.run)(state),
                    None => task.reject(CladeError::Pool(format!("Execution unit {} is unavailable", id))),
                }
                // fails only once a forced shutdown took the dispatcher down
                let _ = commands.send(Command::Settled { unit: id, task_id });
            }
            UnitMessage::Shutdown => break,
        }
    }

    drop(state);
    debug!("Execution unit {} stopped", id);
}
