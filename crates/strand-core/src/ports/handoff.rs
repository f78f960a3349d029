//! Handoff ports.
//!
//! Items are shared as `Arc<U>` and identified by pointer, so the same
//! item can be looked up again for cancellation.

use std::sync::Arc;

use crate::domain::HandoffError;

/// Producer side. Any number of threads may add items.
pub trait HandoffWriter<U>: Send + Sync {
    /// Append an item. Never blocks on capacity: the queue is unbounded.
    fn add_item(&self, item: Arc<U>) -> Result<(), HandoffError>;
}

/// Consumer side.
///
/// Exactly one thread may call [`peek`](HandoffReader::peek). The other
/// operations may be called from anywhere.
pub trait HandoffReader<U>: Send + Sync {
    /// Block until an item is available or the reader is released.
    ///
    /// Returns `Ok(None)` once released; the caller should stop.
    fn peek(&self) -> Result<Option<Arc<U>>, HandoffError>;

    /// Remove `item` if it is still queued.
    ///
    /// `Ok(false)` means the consumer already took it; too late to cancel.
    fn remove_item(&self, item: &Arc<U>) -> Result<bool, HandoffError>;

    /// Permanently wake the consumer. Idempotent.
    fn release_reader(&self) -> Result<(), HandoffError>;

    /// Drop every queued item and refuse all further operations.
    /// Call once; a second call fails.
    fn dispose(&self) -> Result<(), HandoffError>;
}
