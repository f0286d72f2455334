use crate::SortSpecification;

/// Errors produced by a [`VirtualListLoader`].
///
/// The load worker captures the error as its last error and transitions to
/// [`WorkerState::StoppedByError`](crate::WorkerState); it is never unwound
/// into the owner thread.
pub type LoaderError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// One successfully loaded block of items.
#[derive(Clone, Debug)]
pub struct LoadedRange<T> {
    /// The items at `start..start + items.len()` in the requested order.
    pub items: Vec<T>,
    /// The authoritative total number of items in the dataset.
    pub overall_count: usize,
}

/// The data source behind a [`VirtualList`](crate::VirtualList).
///
/// `load_range` is invoked on the list's worker thread and may block for as
/// long as it needs; no timeout is imposed by this layer. If a timeout is
/// desired the loader must enforce it itself.
pub trait VirtualListLoader<T>: Send + Sync {
    /// Whether sort specifications passed to `load_range` are honored.
    ///
    /// When `false`, sort mutations on the list are rejected with
    /// [`VirtualListError::SortUnsupported`](crate::VirtualListError).
    fn can_sort(&self) -> bool {
        false
    }

    /// Loads `count` items starting at `start` under `sort`, and reports the
    /// authoritative overall count.
    fn load_range(
        &self,
        start: usize,
        count: usize,
        sort: &SortSpecification,
    ) -> Result<LoadedRange<T>, LoaderError>;
}
