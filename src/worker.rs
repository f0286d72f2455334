use std::collections::VecDeque;
use std::error::Error;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread;

use crate::ExecutionContext;
use crate::observer::post_or_call;

/// Lifecycle of a [`QueuedWorker`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WorkerState {
    /// Idle, empty queue.
    Standby,
    /// A worker thread is draining the queue.
    Processing,
    /// The work callback failed. Terminal until [`QueuedWorker::retry`].
    StoppedByError,
}

/// An item accepted by a [`QueuedWorker`] queue.
///
/// `dedup_key` is the explicit deduplication key: enqueuing an item whose key
/// equals an already queued item's key is a no-op. For page loads the key is
/// the page index, so overlapping requests for the same page collapse into
/// one queue entry.
pub trait WorkItem: Clone + Send + 'static {
    type Key: PartialEq + Send;

    fn dedup_key(&self) -> Self::Key;
}

/// Error type returned by the work callback.
pub type WorkerError = Box<dyn Error + Send + Sync + 'static>;

/// Callback invoked to notify worker state transitions.
pub type StateChangedCallback = Arc<dyn Fn(WorkerState) + Send + Sync>;

type WorkCallback<W> = Box<dyn Fn(&W) -> Result<(), WorkerError> + Send + Sync>;

/// A thread-safe, single-worker, FIFO, deduplicating task queue.
///
/// At most one work item is in flight at any time; items run in submission
/// order. The queue head is peeked, not dequeued, before the callback runs:
/// a failing item therefore stays at the head and is exactly the item
/// [`retry`](Self::retry) attempts again. The internal mutex is never held
/// while the callback executes, so enqueues and state reads stay responsive
/// during a slow work item.
pub struct QueuedWorker<W: WorkItem> {
    shared: Arc<Shared<W>>,
}

struct Shared<W> {
    inner: Mutex<Inner<W>>,
    // Signaled whenever the worker leaves Processing; `clear` waits on it.
    idle: Condvar,
    callback: WorkCallback<W>,
    context: Option<Arc<dyn ExecutionContext>>,
    on_state_changed: Option<StateChangedCallback>,
}

struct Inner<W> {
    queue: VecDeque<W>,
    state: WorkerState,
    // Set by `clear` while an item is in flight: drop the whole queue once
    // that item finishes.
    clear_requested: bool,
    last_error: Option<Arc<dyn Error + Send + Sync + 'static>>,
}

impl<W: WorkItem> QueuedWorker<W> {
    /// Creates a worker that runs `callback` for each queued item.
    pub fn new(callback: impl Fn(&W) -> Result<(), WorkerError> + Send + Sync + 'static) -> Self {
        Self::with_context(callback, None, None)
    }

    /// Creates a worker with an optional execution context and state hook.
    ///
    /// State notifications are posted to `context` when one is supplied;
    /// otherwise they fire synchronously on whichever thread changed the
    /// state, so the hook must expect cross-thread calls.
    pub fn with_context(
        callback: impl Fn(&W) -> Result<(), WorkerError> + Send + Sync + 'static,
        context: Option<Arc<dyn ExecutionContext>>,
        on_state_changed: Option<StateChangedCallback>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    queue: VecDeque::new(),
                    state: WorkerState::Standby,
                    clear_requested: false,
                    last_error: None,
                }),
                idle: Condvar::new(),
                callback: Box::new(callback),
                context,
                on_state_changed,
            }),
        }
    }

    pub fn state(&self) -> WorkerState {
        self.shared.lock().state
    }

    /// The error captured by the most recent failing work item.
    ///
    /// Reset when processing resumes (enqueue from standby, or retry).
    pub fn last_error(&self) -> Option<Arc<dyn Error + Send + Sync + 'static>> {
        self.shared.lock().last_error.clone()
    }

    /// Number of queued items, including the one in flight.
    pub fn queue_len(&self) -> usize {
        self.shared.lock().queue.len()
    }

    /// Appends `item` unless an item with an equal dedup key is already
    /// queued. Starts the worker thread if the queue was standing by.
    pub fn enqueue(&self, item: W) {
        let mut inner = self.shared.lock();
        let key = item.dedup_key();
        if inner.queue.iter().any(|q| q.dedup_key() == key) {
            ltrace!("enqueue: duplicate work item dropped");
            return;
        }
        inner.queue.push_back(item);
        if inner.state == WorkerState::Standby {
            Shared::begin_processing(&self.shared, &mut inner);
            drop(inner);
            self.shared.notify_state(WorkerState::Processing);
        }
    }

    /// Empties the queue.
    ///
    /// If a work item is in flight, blocks the calling thread until it
    /// finishes, then discards the entire queue, including anything enqueued
    /// while blocked. Cancellation is cooperative only: the in-flight
    /// callback is never preempted.
    pub fn clear(&self) {
        let mut inner = self.shared.lock();
        if inner.state == WorkerState::Processing {
            inner.clear_requested = true;
            while inner.state == WorkerState::Processing {
                inner = self
                    .shared
                    .idle
                    .wait(inner)
                    .unwrap_or_else(|e| e.into_inner());
            }
        } else {
            inner.queue.clear();
            if inner.state != WorkerState::Standby {
                inner.state = WorkerState::Standby;
                drop(inner);
                self.shared.notify_state(WorkerState::Standby);
            }
        }
    }

    /// Resumes processing after a failure, starting with the item that
    /// failed. Valid only from `StoppedByError`; a no-op otherwise.
    ///
    /// There is no backoff and no attempt limit: the head item is retried
    /// every time this is called.
    pub fn retry(&self) {
        let mut inner = self.shared.lock();
        if inner.state != WorkerState::StoppedByError {
            return;
        }
        Shared::begin_processing(&self.shared, &mut inner);
        drop(inner);
        self.shared.notify_state(WorkerState::Processing);
    }
}

impl<W: WorkItem> Drop for QueuedWorker<W> {
    fn drop(&mut self) {
        // Waits for in-flight completion; the detached worker thread only
        // holds the shared state, never this handle.
        self.clear();
    }
}

impl<W: WorkItem> Shared<W> {
    fn lock(&self) -> MutexGuard<'_, Inner<W>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn begin_processing(shared: &Arc<Self>, inner: &mut Inner<W>) {
        inner.state = WorkerState::Processing;
        inner.clear_requested = false;
        inner.last_error = None;
        let shared = Arc::clone(shared);
        thread::spawn(move || Self::process(shared));
    }

    fn process(shared: Arc<Self>) {
        loop {
            let item = {
                let mut inner = shared.lock();
                match inner.queue.front() {
                    Some(item) => item.clone(),
                    None => {
                        inner.state = WorkerState::Standby;
                        shared.idle.notify_all();
                        drop(inner);
                        shared.notify_state(WorkerState::Standby);
                        return;
                    }
                }
            };

            // The mutex is not held while the callback runs.
            let result = (shared.callback)(&item);

            let mut inner = shared.lock();
            match result {
                Ok(()) => {
                    if inner.clear_requested {
                        inner.queue.clear();
                    } else {
                        inner.queue.pop_front();
                    }
                    if inner.queue.is_empty() {
                        inner.state = WorkerState::Standby;
                        shared.idle.notify_all();
                        drop(inner);
                        shared.notify_state(WorkerState::Standby);
                        return;
                    }
                }
                Err(err) => {
                    lwarn!("work item failed: {err}");
                    inner.last_error = Some(Arc::from(err));
                    if inner.clear_requested {
                        // `clear` was promised an empty queue; there is
                        // nothing left to retry, so stand down.
                        inner.queue.clear();
                        inner.state = WorkerState::Standby;
                        shared.idle.notify_all();
                        drop(inner);
                        shared.notify_state(WorkerState::Standby);
                    } else {
                        inner.state = WorkerState::StoppedByError;
                        shared.idle.notify_all();
                        drop(inner);
                        shared.notify_state(WorkerState::StoppedByError);
                    }
                    return;
                }
            }
        }
    }

    fn notify_state(&self, state: WorkerState) {
        ldebug!(?state, "worker state changed");
        if let Some(cb) = &self.on_state_changed {
            let cb = Arc::clone(cb);
            post_or_call(self.context.as_ref(), move || cb(state));
        }
    }
}
