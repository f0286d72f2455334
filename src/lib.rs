//! A demand-paged data virtualization layer for UI lists.
//!
//! This crate lets a UI component browse a dataset far larger than what can
//! be materialized in memory. Items are fetched in fixed-size pages, on
//! demand, from a pluggable [`VirtualListLoader`]; loaded pages are cached;
//! and a UI-facing current-item and sort-order model stays consistent while
//! loads happen on a background worker.
//!
//! The moving parts, leaf-first:
//! - [`QueuedWorker`]: a single-worker, FIFO, deduplicating task queue with
//!   a three-state lifecycle (standby / processing / stopped-by-error).
//! - An internal page cache over the index range `[0, overall_count)`,
//!   tracking per-page load state and the sort snapshot each page was
//!   loaded under.
//! - [`VirtualList`]: the orchestrator — indexed access, count, cursor,
//!   sort ownership, deferred-refresh batching. The owner thread drives it
//!   and is the sole writer of cache and cursor state; the worker thread
//!   only communicates through a result channel, applied by
//!   [`VirtualList::pump`].
//!
//! It is UI-agnostic. A GUI/TUI layer is expected to provide:
//! - an adapter that reads slots and renders placeholders for
//!   [`Slot::Pending`]
//! - a call to [`VirtualList::pump`] when the results-ready wake fires
//! - optionally an [`ExecutionContext`] that posts callbacks onto its event
//!   loop

#![forbid(unsafe_code)]

#[macro_use]
mod macros;

mod cache;
mod error;
mod list;
mod loader;
mod observer;
mod options;
mod sort;
mod types;
mod worker;


pub use cache::LoadRequest;
pub use error::VirtualListError;
pub use list::VirtualList;
pub use loader::{LoadedRange, LoaderError, VirtualListLoader};
pub use observer::{ExecutionContext, VirtualListObserver};
pub use options::{ResultsReadyCallback, VirtualListOptions};
pub use sort::{SortDescription, SortDirection, SortSpecification};
pub use types::{ItemsChange, ListProperty, Slot};
pub use worker::{QueuedWorker, StateChangedCallback, WorkItem, WorkerError, WorkerState};
