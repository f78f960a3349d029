//! Status - dispatcher counters and their snapshot.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::domain::DispatcherState;

/// Point-in-time view of a dispatcher.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatcherStatus {
    pub state: DispatcherState,
    /// Items accepted by the queue (plus inline sends from the worker).
    pub submitted: u64,
    /// Actions that ran, whether they returned or panicked.
    pub executed: u64,
    /// Subset of `executed` that panicked.
    pub faulted: u64,
    /// Removed from the queue after a claim timeout; never ran.
    pub canceled: u64,
    /// Claimed while the submitter was timing out; result unobserved.
    pub detached: u64,
    /// Waiting in the queue right now.
    pub queued: usize,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    submitted: AtomicU64,
    executed: AtomicU64,
    faulted: AtomicU64,
    canceled: AtomicU64,
    detached: AtomicU64,
}

impl Counters {
    pub(crate) fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_executed(&self, faulted: bool) {
        self.executed.fetch_add(1, Ordering::Relaxed);
        if faulted {
            self.faulted.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_canceled(&self) {
        self.canceled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_detached(&self) {
        self.detached.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, state: DispatcherState, queued: usize) -> DispatcherStatus {
        DispatcherStatus {
            state,
            submitted: self.submitted.load(Ordering::Relaxed),
            executed: self.executed.load(Ordering::Relaxed),
            faulted: self.faulted.load(Ordering::Relaxed),
            canceled: self.canceled.load(Ordering::Relaxed),
            detached: self.detached.load(Ordering::Relaxed),
            queued,
        }
    }
}
