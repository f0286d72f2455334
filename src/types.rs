/// The result of reading a single index from a virtual list.
///
/// An index whose owning page has not finished loading reads as `Pending`;
/// once the page is committed the same index reads as `Realized`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Slot<T> {
    /// The owning page has not been loaded yet (a load may be in flight).
    Pending,
    /// The loaded value.
    Realized(T),
}

impl<T> Slot<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, Slot::Pending)
    }

    /// Returns the realized value, or `None` while pending.
    pub fn realized(self) -> Option<T> {
        match self {
            Slot::Pending => None,
            Slot::Realized(v) => Some(v),
        }
    }
}

/// Cursor-related properties reported through
/// [`VirtualListObserver::on_property_changed`](crate::VirtualListObserver::on_property_changed).
///
/// A notification is raised only for properties whose value actually changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ListProperty {
    CurrentItem,
    CurrentPosition,
    IsCurrentBeforeFirst,
    IsCurrentAfterLast,
}

/// A change to the logical item sequence, scoped to the affected index range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ItemsChange {
    /// The whole view was invalidated (sort change or explicit refresh).
    /// Previously realized values remain readable until replaced.
    Reset,
    /// Items in `start..start + len` transitioned from pending to realized
    /// (or were replaced by a reload).
    Updated { start: usize, len: usize },
    /// The overall count grew; `start..start + len` are the new indices.
    Inserted { start: usize, len: usize },
    /// The overall count shrank; `start..start + len` were removed.
    Removed { start: usize, len: usize },
}
