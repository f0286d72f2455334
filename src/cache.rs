use std::collections::BTreeMap;

use crate::{Slot, SortSpecification, WorkItem};

/// A request for one page, the unit enqueued to the load worker.
///
/// Queue deduplication is keyed on `page_index` alone (see
/// [`WorkItem::dedup_key`]): two logically distinct requests for the same
/// page collapse into one queue entry. The refresh epoch and sort snapshot
/// exist to reject the result on completion, not to tell requests apart.
#[derive(Clone, Debug)]
pub struct LoadRequest {
    pub page_index: usize,
    /// First item index covered by the page.
    pub start: usize,
    /// Number of items to load (clamped to the overall count when known).
    pub count: usize,
    /// Refresh generation this request was issued under.
    pub(crate) epoch: u64,
    /// Sort specification captured when the request was issued.
    pub snapshot: SortSpecification,
}

impl WorkItem for LoadRequest {
    type Key = usize;

    fn dedup_key(&self) -> usize {
        self.page_index
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PageState {
    Loading,
    Loaded,
    Failed,
}

struct Page<T> {
    state: PageState,
    /// Generation + snapshot the page was (or is being) loaded under.
    epoch: u64,
    snapshot: SortSpecification,
    /// Realized values. Kept across invalidation so the UI can keep showing
    /// the old values until the replacement page arrives (no flicker).
    items: Vec<T>,
}

/// Sparse, fixed-page-size cache over the index range `[0, overall_count)`.
///
/// Absent pages are implicitly not loaded. The cache never talks to the
/// worker: [`request_for`](Self::request_for) hands a [`LoadRequest`] back to
/// the orchestrator, which is the only writer of cache state.
pub(crate) struct PageCache<T> {
    page_size: usize,
    pages: BTreeMap<usize, Page<T>>,
    overall_count: Option<usize>,
}

impl<T> PageCache<T> {
    pub(crate) fn new(page_size: usize) -> Self {
        debug_assert!(page_size > 0);
        Self {
            page_size,
            pages: BTreeMap::new(),
            overall_count: None,
        }
    }

    pub(crate) fn page_size(&self) -> usize {
        self.page_size
    }

    /// The authoritative total, unknown until the first successful load.
    pub(crate) fn overall_count(&self) -> Option<usize> {
        self.overall_count
    }

    pub(crate) fn len(&self) -> usize {
        self.overall_count.unwrap_or(0)
    }

    pub(crate) fn page_index_of(&self, index: usize) -> usize {
        index / self.page_size
    }

    /// Reads `index` without side effects.
    ///
    /// Returns whatever value is materialized, including a stale value on a
    /// page that is being reloaded after invalidation.
    pub(crate) fn slot(&self, index: usize) -> Slot<&T> {
        let page = match self.pages.get(&self.page_index_of(index)) {
            Some(page) => page,
            None => return Slot::Pending,
        };
        match page.items.get(index % self.page_size) {
            Some(item) => Slot::Realized(item),
            None => Slot::Pending,
        }
    }

    /// Decides whether touching `index` requires a load.
    ///
    /// Returns a request (marking the page as loading under `epoch`/`sort`)
    /// when the page is absent or was loaded/requested under a different
    /// generation or specification. Returns `None` when the page is already
    /// loading, loaded, or failed under the current view; a failed page is
    /// re-requested through retry, not through reads.
    pub(crate) fn request_for(
        &mut self,
        index: usize,
        epoch: u64,
        sort: &SortSpecification,
    ) -> Option<LoadRequest> {
        let page_index = self.page_index_of(index);
        if let Some(page) = self.pages.get_mut(&page_index) {
            if page.epoch == epoch && page.snapshot == *sort {
                return None;
            }
            page.state = PageState::Loading;
            page.epoch = epoch;
            page.snapshot = sort.clone();
        } else {
            self.pages.insert(
                page_index,
                Page {
                    state: PageState::Loading,
                    epoch,
                    snapshot: sort.clone(),
                    items: Vec::new(),
                },
            );
        }

        let start = page_index * self.page_size;
        let count = match self.overall_count {
            Some(total) => self.page_size.min(total.saturating_sub(start)),
            None => self.page_size,
        };
        ltrace!(page_index, start, count, "page load requested");
        Some(LoadRequest {
            page_index,
            start,
            count,
            epoch,
            snapshot: sort.clone(),
        })
    }

    /// Commits a completed load. The caller has already established that the
    /// result is not stale (epoch and snapshot match the live view).
    ///
    /// Returns the previous overall count so the orchestrator can raise
    /// count-change notifications.
    pub(crate) fn commit(
        &mut self,
        page_index: usize,
        items: Vec<T>,
        overall_count: usize,
        epoch: u64,
        snapshot: SortSpecification,
    ) -> Option<usize> {
        let previous = self.overall_count;
        self.overall_count = Some(overall_count);

        self.pages.insert(
            page_index,
            Page {
                state: PageState::Loaded,
                epoch,
                snapshot,
                items,
            },
        );
        // Pages that now start past the end of the dataset can never be read
        // again; drop them.
        let page_size = self.page_size;
        self.pages.retain(|&pi, _| pi * page_size < overall_count);
        previous
    }

    pub(crate) fn mark_failed(&mut self, page_index: usize) {
        if let Some(page) = self.pages.get_mut(&page_index) {
            page.state = PageState::Failed;
        }
    }

    /// Flips failed pages back to loading; paired with the worker's retry,
    /// which re-runs the corresponding queued requests.
    pub(crate) fn mark_retrying(&mut self) {
        for page in self.pages.values_mut() {
            if page.state == PageState::Failed {
                page.state = PageState::Loading;
            }
        }
    }

    /// Forgets the overall count. Pages keep their realized values (the
    /// no-flicker rule); they read as stale the moment the orchestrator's
    /// refresh epoch advances, which is what forces their reload on the next
    /// touch.
    pub(crate) fn invalidate_all(&mut self) {
        self.overall_count = None;
    }

    /// Locates `item` among realized values, in index order.
    pub(crate) fn position_of(&self, item: &T) -> Option<usize>
    where
        T: PartialEq,
    {
        let len = self.len();
        for (&page_index, page) in &self.pages {
            for (offset, candidate) in page.items.iter().enumerate() {
                if candidate == item {
                    let index = page_index * self.page_size + offset;
                    return (index < len).then_some(index);
                }
            }
        }
        None
    }

    #[cfg(test)]
    pub(crate) fn page_state(&self, page_index: usize) -> Option<PageState> {
        self.pages.get(&page_index).map(|p| p.state)
    }
}
