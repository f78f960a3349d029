//! DispatchContext - the synchronous submission entry point.
//!
//! # フロー (send)
//! 1. action を WorkItem で包む
//! 2. queue に追加
//! 3. timeout まで `claimed` を待つ
//!    - claimed: `completed` を無条件に待ち、fault があれば呼び出し側で再送出
//!    - timeout: queue から削除を試みる (削除できれば Canceled、できなければ Detached)

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::ThreadId;

use tracing::{debug, error, trace, warn};

use super::dispatcher::Dispatcher;
use super::status::{Counters, DispatcherStatus};
use crate::config::DispatcherConfig;
use crate::domain::{DispatchError, SendError, Timeout, WorkItem};
use crate::impls::HandoffQueue;
use crate::ports::{HandoffReader, HandoffWriter};

/// What happened to a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome<T> {
    /// The action ran on the worker and returned this value.
    Completed(T),
    /// The claim timeout elapsed and the item was removed before the worker
    /// took it. The action never ran.
    Canceled,
    /// The claim timeout elapsed just as the worker took the item. The action
    /// runs to completion on the worker, but its result and any panic are not
    /// observed by this caller.
    Detached,
}

impl<T> SendOutcome<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, SendOutcome::Completed(_))
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            SendOutcome::Completed(value) => Some(value),
            SendOutcome::Canceled | SendOutcome::Detached => None,
        }
    }
}

/// Runs closures on one dedicated worker thread, serially and in
/// submission order, on behalf of any number of caller threads.
///
/// Construction starts the worker. [`shutdown`](Self::shutdown) (or drop)
/// stops it; work still queued at that point is discarded without running.
/// A caller still waiting for such an item to be claimed is only released
/// by its own timeout, so submitters racing a shutdown should pass one.
///
/// Dropping the last handle from inside an action (on the worker thread)
/// cannot join the worker. The worker is told to exit once that action
/// returns and its thread is detached; the queue is disposed when its last
/// reference goes.
///
/// ```
/// use strand_core::{DispatchContext, SendOutcome};
///
/// let context = DispatchContext::new().unwrap();
/// let outcome = context.send(|| 6 * 7).unwrap();
/// assert_eq!(outcome, SendOutcome::Completed(42));
/// context.shutdown().unwrap();
/// ```
pub struct DispatchContext {
    queue: Arc<HandoffQueue<WorkItem>>,
    dispatcher: Dispatcher,
    counters: Arc<Counters>,
    default_timeout: Timeout,
}

impl DispatchContext {
    /// Start a dispatcher with the default config.
    pub fn new() -> Result<Self, DispatchError> {
        Self::with_config(DispatcherConfig::default())
    }

    pub fn with_config(config: DispatcherConfig) -> Result<Self, DispatchError> {
        config.validate()?;

        let queue = Arc::new(HandoffQueue::new());
        let counters = Arc::new(Counters::default());
        let reader: Arc<dyn HandoffReader<WorkItem>> = queue.clone();
        let dispatcher = Dispatcher::new(reader, Arc::clone(&counters), &config);
        dispatcher.start()?;

        Ok(Self {
            queue,
            dispatcher,
            counters,
            default_timeout: config.default_timeout(),
        })
    }

    pub fn default_timeout(&self) -> Timeout {
        self.default_timeout
    }

    /// Run `action` on the worker with the configured default timeout.
    pub fn send<F, T>(&self, action: F) -> Result<SendOutcome<T>, DispatchError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        self.send_timeout(action, self.default_timeout)
    }

    /// Run `action` on the worker, waiting at most `timeout` for the worker
    /// to claim it.
    ///
    /// Once claimed, this always waits for the action to finish. If the
    /// action panicked, the panic is resumed here with its original payload.
    ///
    /// Called from the worker thread itself (from inside a running action),
    /// the action runs inline: queuing it would wait behind the action that
    /// is making the call.
    pub fn send_timeout<F, T>(
        &self,
        action: F,
        timeout: Timeout,
    ) -> Result<SendOutcome<T>, DispatchError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        if self.dispatcher.is_worker_thread() {
            return Ok(self.run_inline(action));
        }

        let slot: Arc<Mutex<Option<T>>> = Arc::new(Mutex::new(None));
        let item = {
            let slot = Arc::clone(&slot);
            Arc::new(WorkItem::new(move || {
                let value = action();
                *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(value);
            }))
        };
        let id = item.id();

        self.queue.add_item(Arc::clone(&item))?;
        self.counters.record_submitted();
        trace!(item = %id, ?timeout, "work item queued");

        if !item.claimed().wait_for(timeout) {
            return if self.queue.remove_item(&item)? {
                self.counters.record_canceled();
                debug!(item = %id, "claim timeout elapsed; submission canceled");
                Ok(SendOutcome::Canceled)
            } else {
                self.counters.record_detached();
                warn!(item = %id, "claim timeout raced the worker; result will not be observed");
                Ok(SendOutcome::Detached)
            };
        }

        // claimed 後は必ず完了を待つ
        item.completed().wait();
        if let Some(fault) = item.take_fault() {
            panic::resume_unwind(fault);
        }

        let value = slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(DispatchError::MissingResult(id))?;
        Ok(SendOutcome::Completed(value))
    }

    /// Like [`send_timeout`](Self::send_timeout) for fallible actions: an
    /// `Err` returned by the action comes back as [`SendError::Action`].
    pub fn try_send<F, T, E>(
        &self,
        action: F,
        timeout: Timeout,
    ) -> Result<SendOutcome<T>, SendError<E>>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        match self.send_timeout(action, timeout)? {
            SendOutcome::Completed(Ok(value)) => Ok(SendOutcome::Completed(value)),
            SendOutcome::Completed(Err(error)) => Err(SendError::Action(error)),
            SendOutcome::Canceled => Ok(SendOutcome::Canceled),
            SendOutcome::Detached => Ok(SendOutcome::Detached),
        }
    }

    /// Submit from async code.
    ///
    /// The blocking protocol runs on tokio's blocking pool so the calling
    /// task's executor thread is never parked. Panics are resumed in the
    /// awaiting task.
    pub async fn send_async<F, T>(
        self: &Arc<Self>,
        action: F,
        timeout: Timeout,
    ) -> Result<SendOutcome<T>, DispatchError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let context = Arc::clone(self);
        match tokio::task::spawn_blocking(move || context.send_timeout(action, timeout)).await {
            Ok(result) => result,
            Err(join_error) if join_error.is_panic() => {
                panic::resume_unwind(join_error.into_panic())
            }
            Err(join_error) => Err(DispatchError::Bridge(join_error.to_string())),
        }
    }

    /// Stop the worker and dispose the queue. A second call is a no-op.
    pub fn shutdown(&self) -> Result<(), DispatchError> {
        self.dispatcher.stop()
    }

    pub fn status(&self) -> DispatcherStatus {
        let queued = self.queue.pending().unwrap_or(0);
        self.counters.snapshot(self.dispatcher.state(), queued)
    }

    pub fn worker_thread_id(&self) -> Option<ThreadId> {
        self.dispatcher.worker_thread_id()
    }

    pub fn is_worker_thread(&self) -> bool {
        self.dispatcher.is_worker_thread()
    }

    fn run_inline<F, T>(&self, action: F) -> SendOutcome<T>
    where
        F: FnOnce() -> T,
    {
        trace!("send issued on the worker thread; running inline");
        self.counters.record_submitted();
        let result = panic::catch_unwind(AssertUnwindSafe(action));
        self.counters.record_executed(result.is_err());
        match result {
            Ok(value) => SendOutcome::Completed(value),
            Err(fault) => panic::resume_unwind(fault),
        }
    }
}

impl Drop for DispatchContext {
    fn drop(&mut self) {
        // The worker cannot join itself: ask it to exit after the current action.
        if self.dispatcher.is_worker_thread() {
            debug!("context dropped on the worker thread; requesting stop without join");
            if let Err(e) = self.dispatcher.request_stop() {
                error!(error = %e, "failed to request dispatcher stop on drop");
            }
            return;
        }
        if let Err(e) = self.dispatcher.stop() {
            error!(error = %e, "failed to stop dispatcher on drop");
        }
    }
}
