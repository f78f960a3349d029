//! Work item: one deferred action plus its two completion signals.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use super::{Signal, WorkItemId};

/// Payload of a panic raised by an action, kept so it can be re-raised
/// on the submitting thread.
pub type Fault = Box<dyn Any + Send + 'static>;

type Action = Box<dyn FnOnce() + Send + 'static>;

/// A deferred action handed from a submitter to the worker thread.
///
/// Lifecycle:
/// - created by the submitter, queued once
/// - either claimed and executed exactly once by the worker,
///   or removed from the queue before the worker claims it
///
/// Only the submitter and the worker ever hold a given item.
pub struct WorkItem {
    id: WorkItemId,
    action: Mutex<Option<Action>>,
    /// Set the instant the worker starts on this item.
    claimed: Signal,
    /// Set after the action returned or panicked.
    completed: Signal,
    fault: Mutex<Option<Fault>>,
}

impl WorkItem {
    pub fn new(action: impl FnOnce() + Send + 'static) -> Self {
        Self {
            id: WorkItemId::next(),
            action: Mutex::new(Some(Box::new(action))),
            claimed: Signal::new(),
            completed: Signal::new(),
            fault: Mutex::new(None),
        }
    }

    pub fn id(&self) -> WorkItemId {
        self.id
    }

    /// Run the action. Worker thread only.
    ///
    /// `claimed` is set before the action starts so a waiting submitter
    /// knows cancellation is no longer possible. A panic is caught and
    /// stored as the item's fault; it never unwinds into the caller.
    /// `completed` is always set last. A second call runs nothing.
    pub fn execute(&self) {
        self.execute_then(|_| {});
    }

    /// Like [`WorkItem::execute`], but calls `before_complete` with the
    /// faulted flag after the action finished and before `completed` is set.
    /// Anything recorded there is visible to the submitter once it wakes.
    pub fn execute_then(&self, before_complete: impl FnOnce(bool)) {
        self.claimed.set();

        let action = lock(&self.action).take();
        match action {
            Some(action) => {
                if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(action)) {
                    debug!(item = %self.id, "action panicked; fault captured for submitter");
                    *lock(&self.fault) = Some(payload);
                }
            }
            None => warn!(item = %self.id, "work item executed more than once; ignoring"),
        }

        before_complete(self.is_faulted());
        self.completed.set();
    }

    pub fn claimed(&self) -> &Signal {
        &self.claimed
    }

    pub fn completed(&self) -> &Signal {
        &self.completed
    }

    pub fn is_faulted(&self) -> bool {
        lock(&self.fault).is_some()
    }

    /// Take the captured fault, leaving the slot empty.
    pub fn take_fault(&self) -> Option<Fault> {
        lock(&self.fault).take()
    }
}

impl fmt::Debug for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkItem")
            .field("id", &self.id)
            .field("claimed", &self.claimed.is_set())
            .field("completed", &self.completed.is_set())
            .field("faulted", &self.is_faulted())
            .finish()
    }
}

// Actions run outside these locks, so poisoning only means a panic elsewhere.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
