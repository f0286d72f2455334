use std::sync::Arc;

use crate::{ExecutionContext, VirtualListObserver};

/// A callback fired when load results are ready to be pumped.
///
/// Invoked through the configured [`ExecutionContext`] when one is present,
/// otherwise synchronously on the worker thread.
pub type ResultsReadyCallback = Arc<dyn Fn() + Send + Sync>;

/// Configuration for [`VirtualList`](crate::VirtualList).
///
/// Replaces ambient/framework-global configuration with an explicit struct
/// passed at construction; there is no process-wide mutable state.
#[derive(Clone)]
pub struct VirtualListOptions {
    /// Number of items per page. Must be positive; construction fails with
    /// [`VirtualListError::InvalidPageSize`](crate::VirtualListError)
    /// otherwise.
    ///
    /// Larger pages amortize loader round-trips; smaller pages reduce
    /// per-miss latency and wasted fetch on sparse access.
    pub page_size: usize,

    /// Marshals worker-side notifications onto the owner's context.
    ///
    /// Without one, worker state changes and the results-ready wake fire on
    /// the worker thread; that is only safe if the consumer guarantees
    /// single-threaded access on its side.
    pub execution_context: Option<Arc<dyn ExecutionContext>>,

    /// Receives change notifications.
    pub observer: Option<Arc<dyn VirtualListObserver>>,

    /// Wake signal telling the adapter to call
    /// [`VirtualList::pump`](crate::VirtualList::pump). Without it the
    /// adapter must poll.
    pub on_results_ready: Option<ResultsReadyCallback>,
}

impl VirtualListOptions {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size,
            execution_context: None,
            observer: None,
            on_results_ready: None,
        }
    }

    pub fn with_execution_context(mut self, context: Arc<dyn ExecutionContext>) -> Self {
        self.execution_context = Some(context);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn VirtualListObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn with_on_results_ready(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_results_ready = Some(Arc::new(f));
        self
    }
}

impl std::fmt::Debug for VirtualListOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualListOptions")
            .field("page_size", &self.page_size)
            .field("execution_context", &self.execution_context.is_some())
            .field("observer", &self.observer.is_some())
            .field("on_results_ready", &self.on_results_ready.is_some())
            .finish()
    }
}
