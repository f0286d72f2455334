/// Contract violations reported by [`VirtualList`](crate::VirtualList).
///
/// Loader failures are deliberately not represented here: they are captured
/// by the load worker as its last error and surfaced through
/// [`WorkerState::StoppedByError`](crate::WorkerState), so a slow or broken
/// backend never turns into a panic or a poisoned list.
#[derive(Debug, thiserror::Error)]
pub enum VirtualListError {
    /// Cursor move outside `[-1, len]`.
    #[error("current position {position} out of range (len {len})")]
    PositionOutOfRange { position: isize, len: usize },

    /// Indexed read outside `[0, len)`.
    #[error("index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// Cursor state was accessed while a refresh is deferred; the cursor is
    /// not stable mid-batch.
    #[error("operation not allowed while refresh is deferred")]
    RefreshDeferred,

    /// A sort mutation was requested but the loader reports `can_sort() == false`.
    #[error("the loader does not support sorting")]
    SortUnsupported,

    /// `page_size` must be a positive integer.
    #[error("page size must be greater than zero")]
    InvalidPageSize,
}
