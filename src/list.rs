use std::error::Error;
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::cache::{LoadRequest, PageCache};
use crate::observer::post_or_call;
use crate::worker::StateChangedCallback;
use crate::{
    ItemsChange, ListProperty, QueuedWorker, Slot, SortDirection, SortSpecification,
    VirtualListError, VirtualListLoader, VirtualListObserver, VirtualListOptions, WorkerState,
};

/// Result of one loader call, produced on the worker thread and applied on
/// the owner thread by [`VirtualList::pump`].
enum LoadCompletion<T> {
    Loaded {
        page_index: usize,
        start: usize,
        epoch: u64,
        snapshot: SortSpecification,
        items: Vec<T>,
        overall_count: usize,
    },
    Failed {
        page_index: usize,
        epoch: u64,
    },
}

/// A demand-paged view over a dataset far larger than what can be
/// materialized in memory.
///
/// Reads are index-based and never block: an index whose page has not loaded
/// yet reads as [`Slot::Pending`] and schedules the page's load on a
/// background worker as a side effect. Completed loads are applied by
/// [`pump`](Self::pump), which the owning thread calls when the
/// results-ready wake fires (or on a polling cadence).
///
/// This type is intentionally UI-agnostic:
/// - It does not hold any UI objects.
/// - The `&mut self` API makes the owner the sole writer of cache and cursor
///   state; the worker thread only communicates through a result channel.
/// - Change notifications go through an injected [`VirtualListObserver`]
///   rather than ambient framework events.
pub struct VirtualList<T: Send + 'static> {
    loader: Arc<dyn VirtualListLoader<T>>,
    observer: Option<Arc<dyn VirtualListObserver>>,
    cache: PageCache<T>,
    worker: QueuedWorker<LoadRequest>,
    completions: Receiver<LoadCompletion<T>>,
    sort: SortSpecification,
    /// Refresh generation; bumped by every invalidate/reload cycle. Results
    /// issued under an older generation are discarded on arrival.
    epoch: u64,
    defer_depth: usize,
    needs_refresh: bool,
    position: isize,
    before_first: bool,
    after_last: bool,
}

impl<T: Send + 'static> VirtualList<T> {
    /// Creates a list over `loader` and schedules the initial page-0 load so
    /// the overall count becomes known without an explicit first read.
    pub fn new(
        loader: Arc<dyn VirtualListLoader<T>>,
        options: VirtualListOptions,
    ) -> Result<Self, VirtualListError> {
        if options.page_size == 0 {
            return Err(VirtualListError::InvalidPageSize);
        }

        let (tx, rx) = unbounded();
        let worker = Self::spawn_worker(&loader, &options, tx);

        let mut list = Self {
            loader,
            observer: options.observer,
            cache: PageCache::new(options.page_size),
            worker,
            completions: rx,
            sort: SortSpecification::new(),
            epoch: 0,
            defer_depth: 0,
            needs_refresh: false,
            position: -1,
            before_first: true,
            after_last: false,
        };
        ldebug!(page_size = list.cache.page_size(), "VirtualList::new");
        list.schedule(0);
        Ok(list)
    }

    fn spawn_worker(
        loader: &Arc<dyn VirtualListLoader<T>>,
        options: &VirtualListOptions,
        tx: Sender<LoadCompletion<T>>,
    ) -> QueuedWorker<LoadRequest> {
        let loader = Arc::clone(loader);
        let context = options.execution_context.clone();
        let wake_context = context.clone();
        let wake = options.on_results_ready.clone();

        let on_state_changed = options.observer.clone().map(|observer| {
            Arc::new(move |state: WorkerState| observer.on_worker_state_changed(state))
                as StateChangedCallback
        });

        QueuedWorker::with_context(
            move |request: &LoadRequest| {
                let (completion, outcome) =
                    match loader.load_range(request.start, request.count, &request.snapshot) {
                        Ok(range) => (
                            LoadCompletion::Loaded {
                                page_index: request.page_index,
                                start: request.start,
                                epoch: request.epoch,
                                snapshot: request.snapshot.clone(),
                                items: range.items,
                                overall_count: range.overall_count,
                            },
                            Ok(()),
                        ),
                        Err(err) => (
                            LoadCompletion::Failed {
                                page_index: request.page_index,
                                epoch: request.epoch,
                            },
                            Err(err),
                        ),
                    };
                // The owner may already be gone; a dead channel just means
                // nobody will pump this result.
                let _ = tx.send(completion);
                if let Some(wake) = &wake {
                    let wake = Arc::clone(wake);
                    post_or_call(wake_context.as_ref(), move || wake());
                }
                outcome
            },
            context,
            on_state_changed,
        )
    }

    /// The configured page size.
    pub fn page_size(&self) -> usize {
        self.cache.page_size()
    }

    /// Number of items, 0 until the first load reports the authoritative
    /// count.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The authoritative count, or `None` before the first successful load
    /// (and between a refresh and its first reload).
    pub fn overall_count(&self) -> Option<usize> {
        self.cache.overall_count()
    }

    /// Reads the item at `index`, scheduling its page's load when needed.
    ///
    /// While the overall count is unknown any index may be probed; once the
    /// count is known, indices outside `[0, len)` fail with
    /// [`VirtualListError::IndexOutOfRange`].
    pub fn get(&mut self, index: usize) -> Result<Slot<&T>, VirtualListError> {
        if let Some(len) = self.cache.overall_count() {
            if index >= len {
                return Err(VirtualListError::IndexOutOfRange { index, len });
            }
        }
        self.schedule(index);
        Ok(self.cache.slot(index))
    }

    /// Whether `item` equals a realized value in the list.
    pub fn contains(&self, item: &T) -> bool
    where
        T: PartialEq,
    {
        self.cache.position_of(item).is_some()
    }

    /// Index of `item` among realized values, in index order.
    ///
    /// Items on pages that have not loaded cannot be found.
    pub fn index_of(&self, item: &T) -> Option<usize>
    where
        T: PartialEq,
    {
        self.cache.position_of(item)
    }

    /// Applies all completed loads that have arrived since the last call.
    ///
    /// Must run on the owner thread; this is the only place load results
    /// touch cache or cursor state. Stale results (older refresh generation
    /// or mismatched sort snapshot) are discarded, not applied. Returns the
    /// number of pages committed.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.completions.try_recv() {
            match completion {
                LoadCompletion::Loaded {
                    page_index,
                    start,
                    epoch,
                    snapshot,
                    items,
                    overall_count,
                } => {
                    if epoch != self.epoch || snapshot != self.sort {
                        ldebug!(page_index, "stale load result discarded");
                        continue;
                    }
                    let item_count = items.len();
                    let previous =
                        self.cache
                            .commit(page_index, items, overall_count, epoch, snapshot);
                    applied += 1;
                    ltrace!(page_index, overall_count, "page committed");
                    self.notify_count_change(previous, overall_count);
                    if start < overall_count && item_count > 0 {
                        let len = item_count.min(overall_count - start);
                        self.notify_items(ItemsChange::Updated { start, len });
                    }
                    self.sync_cursor_with_len();
                }
                LoadCompletion::Failed { page_index, epoch } => {
                    if epoch == self.epoch {
                        self.cache.mark_failed(page_index);
                    }
                }
            }
        }
        applied
    }

    /// Current state of the load worker.
    pub fn worker_state(&self) -> WorkerState {
        self.worker.state()
    }

    /// The loader error that stopped the worker, if any.
    pub fn last_load_error(&self) -> Option<Arc<dyn Error + Send + Sync + 'static>> {
        self.worker.last_error()
    }

    /// Number of queued page loads, including the one in flight.
    pub fn queued_loads(&self) -> usize {
        self.worker.queue_len()
    }

    /// Resumes loading after a loader failure, re-attempting the failed
    /// request before anything queued behind it. No backoff, no attempt
    /// limit: every call retries the same head request.
    pub fn retry(&mut self) {
        self.cache.mark_retrying();
        self.worker.retry();
    }

    // ---- sort ----

    /// Whether the loader honors sort specifications.
    pub fn can_sort(&self) -> bool {
        self.loader.can_sort()
    }

    /// The live sort specification.
    pub fn sort(&self) -> &SortSpecification {
        &self.sort
    }

    /// Replaces the sort specification and refreshes (or defers the refresh
    /// when inside [`defer_refresh`](Self::defer_refresh)). Setting an
    /// identical specification is a no-op.
    pub fn set_sort(&mut self, sort: SortSpecification) -> Result<(), VirtualListError> {
        if !self.can_sort() {
            return Err(VirtualListError::SortUnsupported);
        }
        if self.sort == sort {
            return Ok(());
        }
        ldebug!(%sort, "sort specification changed");
        self.sort = sort;
        self.refresh_or_defer();
        Ok(())
    }

    /// Removes all sort descriptions.
    pub fn clear_sort(&mut self) -> Result<(), VirtualListError> {
        self.set_sort(SortSpecification::new())
    }

    /// The column-click rule: toggling the active field flips its direction,
    /// toggling a different field resets to ascending on that field. Returns
    /// the direction now active on `field` so a header indicator can follow.
    pub fn toggle_sort(&mut self, field: &str) -> Result<SortDirection, VirtualListError> {
        let (sort, direction) = self.sort.toggled(field);
        self.set_sort(sort)?;
        Ok(direction)
    }

    // ---- refresh ----

    /// Invalidates every cached page and reloads lazily. Deferred (batched
    /// to a single cycle) when called inside [`defer_refresh`](Self::defer_refresh).
    pub fn refresh(&mut self) {
        self.refresh_or_defer();
    }

    /// Runs `f` with reactive refresh suspended: any number of sort
    /// mutations or refresh requests inside the scope trigger exactly one
    /// invalidate/reload cycle when the outermost scope exits.
    ///
    /// Cursor state is unstable mid-batch, so reading it inside the scope
    /// fails with [`VirtualListError::RefreshDeferred`].
    pub fn defer_refresh(&mut self, f: impl FnOnce(&mut Self)) {
        self.defer_depth += 1;
        f(self);
        debug_assert!(self.defer_depth > 0, "defer_refresh depth underflow");
        self.defer_depth = self.defer_depth.saturating_sub(1);
        if self.defer_depth == 0 && self.needs_refresh {
            self.needs_refresh = false;
            self.do_refresh();
        }
    }

    fn refresh_or_defer(&mut self) {
        if self.defer_depth > 0 {
            self.needs_refresh = true;
        } else {
            self.do_refresh();
        }
    }

    fn do_refresh(&mut self) {
        ldebug!(epoch = self.epoch + 1, "refresh");
        // Waits for at most the in-flight load; queued requests issued under
        // the previous generation are discarded so the page-index dedup key
        // stays sound for new requests.
        self.worker.clear();
        self.epoch += 1;
        self.cache.invalidate_all();
        self.notify_items(ItemsChange::Reset);
        if self.position != -1 || self.after_last {
            self.set_current(-1);
        }
        // Rediscover the overall count.
        self.schedule(0);
    }

    // ---- current-item cursor ----

    /// Cursor position in `[-1, len]`; `-1` is before-first, `len` is
    /// after-last.
    pub fn current_position(&self) -> Result<isize, VirtualListError> {
        self.ensure_not_deferred()?;
        Ok(self.position)
    }

    /// The item under the cursor: `None` when before-first or after-last,
    /// otherwise the slot at the current position (which may be pending).
    pub fn current_item(&self) -> Result<Option<Slot<&T>>, VirtualListError> {
        self.ensure_not_deferred()?;
        if self.position < 0 || self.position >= self.len() as isize {
            return Ok(None);
        }
        Ok(Some(self.cache.slot(self.position as usize)))
    }

    pub fn is_current_before_first(&self) -> Result<bool, VirtualListError> {
        self.ensure_not_deferred()?;
        Ok(self.before_first)
    }

    pub fn is_current_after_last(&self) -> Result<bool, VirtualListError> {
        self.ensure_not_deferred()?;
        Ok(self.after_last)
    }

    /// Moves the cursor to `position`.
    ///
    /// Positions outside `[-1, len]` fail with
    /// [`VirtualListError::PositionOutOfRange`]. The observer's
    /// `on_current_changing` may veto the move, leaving the cursor
    /// unchanged. Returns whether the cursor points at a valid item after
    /// the call.
    pub fn move_current_to_position(&mut self, position: isize) -> Result<bool, VirtualListError> {
        self.ensure_not_deferred()?;
        let len = self.len();
        if position < -1 || position > len as isize {
            return Err(VirtualListError::PositionOutOfRange { position, len });
        }
        if position != self.position && self.allow_current_change() {
            self.set_current(position);
        }
        Ok(self.position >= 0 && self.position < len as isize)
    }

    pub fn move_current_to_first(&mut self) -> Result<bool, VirtualListError> {
        self.move_current_to_position(0)
    }

    pub fn move_current_to_last(&mut self) -> Result<bool, VirtualListError> {
        self.ensure_not_deferred()?;
        self.move_current_to_position(self.len() as isize - 1)
    }

    /// Advances the cursor; returns `Ok(false)` without moving when already
    /// after-last.
    pub fn move_current_to_next(&mut self) -> Result<bool, VirtualListError> {
        self.ensure_not_deferred()?;
        let next = self.position + 1;
        if next > self.len() as isize {
            return Ok(false);
        }
        self.move_current_to_position(next)
    }

    /// Retreats the cursor; returns `Ok(false)` without moving when already
    /// before-first.
    pub fn move_current_to_previous(&mut self) -> Result<bool, VirtualListError> {
        self.ensure_not_deferred()?;
        let previous = self.position - 1;
        if previous < -1 {
            return Ok(false);
        }
        self.move_current_to_position(previous)
    }

    /// Moves the cursor to `item` when it is realized somewhere in the list,
    /// to before-first otherwise.
    pub fn move_current_to(&mut self, item: &T) -> Result<bool, VirtualListError>
    where
        T: PartialEq,
    {
        self.ensure_not_deferred()?;
        let position = self
            .cache
            .position_of(item)
            .map_or(-1, |index| index as isize);
        self.move_current_to_position(position)
    }

    // ---- internals ----

    fn schedule(&mut self, index: usize) {
        if let Some(request) = self.cache.request_for(index, self.epoch, &self.sort) {
            self.worker.enqueue(request);
        }
    }

    fn ensure_not_deferred(&self) -> Result<(), VirtualListError> {
        if self.defer_depth > 0 {
            Err(VirtualListError::RefreshDeferred)
        } else {
            Ok(())
        }
    }

    fn allow_current_change(&self) -> bool {
        self.observer
            .as_ref()
            .is_none_or(|observer| observer.on_current_changing())
    }

    /// Commits the cursor and raises notifications only for what changed.
    fn set_current(&mut self, position: isize) {
        let old_position = self.position;
        let old_before_first = self.before_first;
        let old_after_last = self.after_last;

        let len = self.len() as isize;
        self.position = position;
        self.before_first = position < 0;
        self.after_last = position >= len;

        let item_changed = old_position != position;
        if item_changed {
            if let Some(observer) = &self.observer {
                observer.on_current_changed();
            }
        }
        if old_before_first != self.before_first {
            self.notify_property(ListProperty::IsCurrentBeforeFirst);
        }
        if old_after_last != self.after_last {
            self.notify_property(ListProperty::IsCurrentAfterLast);
        }
        if item_changed {
            self.notify_property(ListProperty::CurrentItem);
            self.notify_property(ListProperty::CurrentPosition);
        }
    }

    /// Re-derives the before-first/after-last flags after the overall count
    /// changed under a stationary cursor, clamping the position when the
    /// dataset shrank past it.
    fn sync_cursor_with_len(&mut self) {
        let len = self.len() as isize;
        if self.position > len {
            self.set_current(len);
            return;
        }
        let before_first = self.position < 0;
        let after_last = self.position >= len;
        let bf_changed = before_first != self.before_first;
        let al_changed = after_last != self.after_last;
        self.before_first = before_first;
        self.after_last = after_last;
        if bf_changed {
            self.notify_property(ListProperty::IsCurrentBeforeFirst);
        }
        if al_changed {
            self.notify_property(ListProperty::IsCurrentAfterLast);
        }
        if bf_changed || al_changed {
            // Entering or leaving the valid range changes what the cursor
            // dereferences to.
            self.notify_property(ListProperty::CurrentItem);
        }
    }

    fn notify_count_change(&self, previous: Option<usize>, new: usize) {
        match previous {
            Some(old) if new > old => {
                self.notify_items(ItemsChange::Inserted {
                    start: old,
                    len: new - old,
                });
            }
            Some(old) if new < old => {
                self.notify_items(ItemsChange::Removed {
                    start: new,
                    len: old - new,
                });
            }
            Some(_) => {}
            None if new > 0 => {
                self.notify_items(ItemsChange::Inserted { start: 0, len: new });
            }
            None => {}
        }
    }

    fn notify_items(&self, change: ItemsChange) {
        if let Some(observer) = &self.observer {
            observer.on_items_changed(change);
        }
    }

    fn notify_property(&self, property: ListProperty) {
        if let Some(observer) = &self.observer {
            observer.on_property_changed(property);
        }
    }
}

impl<T: Send + 'static> std::fmt::Debug for VirtualList<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualList")
            .field("page_size", &self.cache.page_size())
            .field("overall_count", &self.cache.overall_count())
            .field("sort", &self.sort)
            .field("position", &self.position)
            .field("worker_state", &self.worker.state())
            .finish_non_exhaustive()
    }
}
