//! Work item identifiers.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_WORK_ITEM_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide, monotonically increasing id of a [`WorkItem`](super::WorkItem).
///
/// Only used for log correlation. Removal from the queue matches items by
/// identity (pointer), never by id.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkItemId(u64);

impl WorkItemId {
    /// Allocate the next id.
    pub fn next() -> Self {
        Self(NEXT_WORK_ITEM_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WorkItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "item-{}", self.0)
    }
}
