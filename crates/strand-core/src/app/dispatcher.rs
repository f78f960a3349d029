//! Dispatcher - the dedicated worker thread and its lifecycle.
//!
//! The worker is spawned once and never replaced, so every action runs
//! on the same OS thread, one at a time, in queue order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};

use tracing::{debug, error, info, trace};

use super::status::Counters;
use crate::config::DispatcherConfig;
use crate::domain::{DispatchError, DispatcherState, WorkItem};
use crate::ports::HandoffReader;

struct Lifecycle {
    state: DispatcherState,
    join: Option<JoinHandle<()>>,
}

/// Owns the worker thread and drives it through
/// Created -> Running -> Stopping -> Stopped.
pub struct Dispatcher {
    reader: Arc<dyn HandoffReader<WorkItem>>,
    stop: Arc<AtomicBool>,
    lifecycle: Mutex<Lifecycle>,
    worker_id: OnceLock<ThreadId>,
    counters: Arc<Counters>,
    thread_name: String,
    stack_size: Option<usize>,
}

impl Dispatcher {
    pub(crate) fn new(
        reader: Arc<dyn HandoffReader<WorkItem>>,
        counters: Arc<Counters>,
        config: &DispatcherConfig,
    ) -> Self {
        Self {
            reader,
            stop: Arc::new(AtomicBool::new(false)),
            lifecycle: Mutex::new(Lifecycle {
                state: DispatcherState::Created,
                join: None,
            }),
            worker_id: OnceLock::new(),
            counters,
            thread_name: config.thread_name.clone(),
            stack_size: config.stack_size,
        }
    }

    pub fn state(&self) -> DispatcherState {
        self.lock().state
    }

    /// Id of the worker thread, once started.
    pub fn worker_thread_id(&self) -> Option<ThreadId> {
        self.worker_id.get().copied()
    }

    /// Is the calling thread the worker?
    pub fn is_worker_thread(&self) -> bool {
        self.worker_id
            .get()
            .is_some_and(|id| *id == thread::current().id())
    }

    /// Created -> Running: spawn the worker thread.
    pub fn start(&self) -> Result<(), DispatchError> {
        let mut lifecycle = self.lock();
        if lifecycle.state != DispatcherState::Created {
            return Err(DispatchError::InvalidState(lifecycle.state));
        }

        let mut builder = thread::Builder::new().name(self.thread_name.clone());
        if let Some(size) = self.stack_size {
            builder = builder.stack_size(size);
        }

        let reader = Arc::clone(&self.reader);
        let stop = Arc::clone(&self.stop);
        let counters = Arc::clone(&self.counters);
        let join = builder
            .spawn(move || worker_loop(reader.as_ref(), &stop, &counters))
            .map_err(DispatchError::Spawn)?;

        // start() runs once per dispatcher, so the cell is always empty here.
        let _ = self.worker_id.set(join.thread().id());
        lifecycle.join = Some(join);
        lifecycle.state = DispatcherState::Running;
        info!(thread = %self.thread_name, "worker thread started");
        Ok(())
    }

    /// Running -> Stopping without joining.
    ///
    /// Sets the stop flag and releases the queue reader so the worker exits
    /// after its current action. Safe on the worker thread itself. A later
    /// [`Dispatcher::stop`] from another thread still joins and disposes.
    pub fn request_stop(&self) -> Result<(), DispatchError> {
        let mut lifecycle = self.lock();
        let state = lifecycle.state;
        if state.is_shutting_down() {
            debug!(?state, "stop already underway; ignoring");
            return Ok(());
        }
        if state == DispatcherState::Created {
            return Err(DispatchError::InvalidState(state));
        }
        self.begin_stopping(&mut lifecycle)
    }

    /// Running -> Stopping -> Stopped.
    ///
    /// Sets the stop flag, releases the queue reader, joins the worker and
    /// disposes the queue. Items still queued are discarded, not run.
    /// Calling again (or concurrently) is a no-op.
    pub fn stop(&self) -> Result<(), DispatchError> {
        if self.is_worker_thread() {
            return Err(DispatchError::StopFromWorker);
        }

        let (join, released) = {
            let mut lifecycle = self.lock();
            let state = lifecycle.state;
            match state {
                DispatcherState::Created => {
                    lifecycle.state = DispatcherState::Stopped;
                    drop(lifecycle);
                    self.reader.dispose()?;
                    return Ok(());
                }
                DispatcherState::Running => {
                    let released = self.begin_stopping(&mut lifecycle);
                    (lifecycle.join.take(), released)
                }
                // After request_stop() the join handle is still here to take.
                DispatcherState::Stopping | DispatcherState::Stopped => {
                    match (state, lifecycle.join.take()) {
                        (DispatcherState::Stopping, Some(join)) => (Some(join), Ok(())),
                        _ => {
                            debug!(?state, "stop requested again; ignoring");
                            return Ok(());
                        }
                    }
                }
            }
        };

        info!(thread = %self.thread_name, "stopping worker thread");
        let joined = join.map_or(Ok(()), JoinHandle::join);
        let disposed = self.reader.dispose();
        self.lock().state = DispatcherState::Stopped;

        if joined.is_err() {
            error!(thread = %self.thread_name, "worker thread panicked; join failed");
            return Err(DispatchError::WorkerPanicked);
        }
        released?;
        disposed?;
        info!(thread = %self.thread_name, "worker thread stopped");
        Ok(())
    }

    // Stopping is only observable once the flag is up and the reader released.
    fn begin_stopping(&self, lifecycle: &mut Lifecycle) -> Result<(), DispatchError> {
        self.stop.store(true, Ordering::Release);
        let released = self.reader.release_reader();
        lifecycle.state = DispatcherState::Stopping;
        released.map_err(DispatchError::from)
    }

    fn lock(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn worker_loop(reader: &dyn HandoffReader<WorkItem>, stop: &AtomicBool, counters: &Counters) {
    debug!("worker loop running");
    loop {
        // stop が来ていたら抜ける
        if stop.load(Ordering::Acquire) {
            break;
        }

        // peek が唯一の待機ポイント
        let item = match reader.peek() {
            Ok(Some(item)) => item,
            // release された: 次のループで stop を判定
            Ok(None) => continue,
            Err(e) => {
                error!(error = %e, "handoff queue unavailable; worker exiting");
                break;
            }
        };

        trace!(item = %item.id(), "claimed work item");
        // Counted before `completed` so a returning submitter sees its own action.
        item.execute_then(|faulted| counters.record_executed(faulted));
        trace!(item = %item.id(), "work item completed");
    }
    debug!("worker loop exited");
}
