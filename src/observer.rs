use std::sync::Arc;

use crate::{ItemsChange, ListProperty, WorkerState};

/// Marshals callbacks onto the owner's execution context (e.g. a UI event
/// loop).
///
/// When configured, worker state notifications and the results-ready wake are
/// posted through it instead of firing on the worker thread. Without one,
/// those callbacks run synchronously on whichever thread produced them, which
/// is only safe if the consumer guarantees single-threaded access on its side.
pub trait ExecutionContext: Send + Sync {
    fn post(&self, task: Box<dyn FnOnce() + Send>);
}

/// Receives change notifications from a [`VirtualList`](crate::VirtualList).
///
/// Injected at construction via
/// [`VirtualListOptions::with_observer`](crate::VirtualListOptions::with_observer).
/// Cursor and items notifications fire on the owner thread (inside cursor
/// moves and [`VirtualList::pump`](crate::VirtualList::pump));
/// `on_worker_state_changed` may fire on the worker thread unless an
/// [`ExecutionContext`] is configured, hence the `Send + Sync` bound.
pub trait VirtualListObserver: Send + Sync {
    /// Cancelable: return `false` to veto the pending cursor move. A vetoed
    /// move leaves the cursor unchanged.
    fn on_current_changing(&self) -> bool {
        true
    }

    /// The cursor committed to a new item. Not cancelable.
    fn on_current_changed(&self) {}

    /// A cursor-derived property changed value. Raised only for properties
    /// that actually changed.
    fn on_property_changed(&self, _property: ListProperty) {}

    /// The item sequence changed (page committed, count changed, reset).
    fn on_items_changed(&self, _change: ItemsChange) {}

    /// The load worker changed state. `StoppedByError` carries no payload
    /// here; the error is retrievable via
    /// [`VirtualList::last_load_error`](crate::VirtualList::last_load_error).
    fn on_worker_state_changed(&self, _state: WorkerState) {}
}

pub(crate) fn post_or_call(
    context: Option<&Arc<dyn ExecutionContext>>,
    task: impl FnOnce() + Send + 'static,
) {
    match context {
        Some(ctx) => ctx.post(Box::new(task)),
        None => task(),
    }
}
