//! Tasks and the handles their submitters await

use cladeflow_core::{CladeError, CladeResult};
use parking_lot::Mutex;
use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Type-erased side of a reply slot, lets the dispatcher reject tasks
/// without knowing their result type.
pub(crate) trait Settle: Send + Sync {
    /// Returns `false` when the task had already settled.
    fn reject(&self, error: CladeError) -> bool;
    fn is_settled(&self) -> bool;
}

/// Single-use result channel. The first settlement wins, later ones are
/// dropped, so a task cancelled by the dispatcher can never also deliver.
struct ReplySlot<R> {
    tx: Mutex<Option<oneshot::Sender<CladeResult<R>>>>,
}

impl<R: Send> ReplySlot<R> {
    fn new(tx: oneshot::Sender<CladeResult<R>>) -> Self {
        Self { tx: Mutex::new(Some(tx)) }
    }

    fn settle(&self, outcome: CladeResult<R>) -> bool {
        match self.tx.lock().take() {
            Some(tx) => {
                // The receiver may be gone already, nobody is waiting then.
                let _ = tx.send(outcome);
                true
            }
            None => false,
        }
    }
}

impl<R: Send> Settle for ReplySlot<R> {
    fn reject(&self, error: CladeError) -> bool {
        self.settle(Err(error))
    }

    fn is_settled(&self) -> bool {
        self.tx.lock().is_none()
    }
}

pub(crate) type Job<S> = Box<dyn FnOnce(&mut S) + Send>;

pub(crate) struct Task<S> {
    pub(crate) id: u64,
    pub(crate) run: Job<S>,
    pub(crate) slot: Arc<dyn Settle>,
}

impl<S: 'static> Task<S> {
    pub(crate) fn new<R, F>(id: u64, f: F) -> (Self, TaskHandle<R>)
    where
        F: FnOnce(&mut S) -> CladeResult<R> + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let slot = Arc::new(ReplySlot::new(tx));
        let run_slot = Arc::clone(&slot);

        let run: Job<S> = Box::new(move |state: &mut S| {
            // Cancelled while waiting in a unit mailbox
            if run_slot.is_settled() {
                return;
            }
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| f(state))).unwrap_or_else(|payload| {
                Err(CladeError::Analysis(format!("Task panicked: {}", panic_message(payload.as_ref()))))
            });
            run_slot.settle(outcome);
        });

        (Self { id, run, slot }, TaskHandle { rx })
    }
}

impl<S> Task<S> {
    pub(crate) fn reject(self, error: CladeError) {
        self.slot.reject(error);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Deferred result of a queued task.
///
/// Resolves to the task's own result, to its error, or to
/// [`CladeError::Cancelled`] when the pool was force-terminated first.
#[must_use = "a task handle does nothing unless awaited"]
pub struct TaskHandle<R> {
    rx: oneshot::Receiver<CladeResult<R>>,
}

impl<R> TaskHandle<R> {
    /// A handle that is already settled with `error`.
    pub(crate) fn failed(error: CladeError) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(Err(error));
        Self { rx }
    }
}

impl<R> Future for TaskHandle<R> {
    type Output = CladeResult<R>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or_else(|_| Err(CladeError::Cancelled)))
    }
}
