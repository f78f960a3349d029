//! HandoffQueue - Mutex + Condvar で実装した単一 consumer の blocking queue
//!
//! - The sequence length, read under the mutex, is the "items available" count.
//! - `shutdown` is the release flag: set once, never cleared.
//! - After `dispose` every operation returns `HandoffError::Disposed`.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use tracing::{debug, trace};

use crate::domain::HandoffError;
use crate::ports::{HandoffReader, HandoffWriter};

struct QueueState<U> {
    items: VecDeque<Arc<U>>,
    /// Reader released: `peek` returns `None` from now on.
    shutdown: bool,
    disposed: bool,
}

impl<U> QueueState<U> {
    fn ensure_live(&self) -> Result<(), HandoffError> {
        if self.disposed {
            Err(HandoffError::Disposed)
        } else {
            Ok(())
        }
    }
}

/// Unbounded FIFO handing `Arc<U>` items to a single consumer thread.
///
/// # 使用例
/// ```
/// use std::sync::Arc;
/// use strand_core::impls::HandoffQueue;
/// use strand_core::ports::{HandoffReader, HandoffWriter};
///
/// let queue: HandoffQueue<i32> = HandoffQueue::new();
/// let item = Arc::new(7);
/// queue.add_item(Arc::clone(&item)).unwrap();
/// assert!(queue.remove_item(&item).unwrap());
/// queue.release_reader().unwrap();
/// assert!(queue.peek().unwrap().is_none());
/// ```
pub struct HandoffQueue<U> {
    state: Mutex<QueueState<U>>,
    /// add / release / dispose 時の通知用
    condvar: Condvar,
}

impl<U> HandoffQueue<U> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                shutdown: false,
                disposed: false,
            }),
            condvar: Condvar::new(),
        }
    }

    /// Number of items waiting to be claimed.
    pub fn pending(&self) -> Result<usize, HandoffError> {
        let state = self.lock();
        state.ensure_live()?;
        Ok(state.items.len())
    }

    pub fn is_released(&self) -> bool {
        self.lock().shutdown
    }

    pub fn is_disposed(&self) -> bool {
        self.lock().disposed
    }

    // Every mutation completes before the guard drops, so a poisoned lock still
    // guards a consistent sequence.
    fn lock(&self) -> MutexGuard<'_, QueueState<U>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<U> Default for HandoffQueue<U> {
    fn default() -> Self {
        Self::new()
    }
}

impl<U: Send + Sync> HandoffWriter<U> for HandoffQueue<U> {
    fn add_item(&self, item: Arc<U>) -> Result<(), HandoffError> {
        let mut state = self.lock();
        state.ensure_live()?;
        if state.shutdown {
            return Err(HandoffError::ReaderReleased);
        }
        state.items.push_back(item);
        trace!(pending = state.items.len(), "item added to handoff queue");

        // 待機中の consumer に通知
        drop(state);
        self.condvar.notify_all();
        Ok(())
    }
}

impl<U: Send + Sync> HandoffReader<U> for HandoffQueue<U> {
    fn peek(&self) -> Result<Option<Arc<U>>, HandoffError> {
        let mut state = self.lock();
        loop {
            state.ensure_live()?;
            // Release wins over pending items: nothing is handed out after shutdown.
            if state.shutdown {
                return Ok(None);
            }
            if let Some(item) = state.items.pop_front() {
                return Ok(Some(item));
            }
            state = self
                .condvar
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn remove_item(&self, item: &Arc<U>) -> Result<bool, HandoffError> {
        let mut state = self.lock();
        state.ensure_live()?;

        // Items only leave through peek or here, so if this item is absent while
        // the lock is held, the consumer has already claimed it.
        let position = state
            .items
            .iter()
            .position(|queued| Arc::ptr_eq(queued, item));
        let removed = match position {
            Some(index) => state.items.remove(index).is_some(),
            None => false,
        };
        trace!(removed, "remove_item");
        Ok(removed)
    }

    fn release_reader(&self) -> Result<(), HandoffError> {
        let mut state = self.lock();
        state.ensure_live()?;
        if !state.shutdown {
            state.shutdown = true;
            debug!(pending = state.items.len(), "handoff queue reader released");
        }
        drop(state);
        self.condvar.notify_all();
        Ok(())
    }

    fn dispose(&self) -> Result<(), HandoffError> {
        let discarded = {
            let mut state = self.lock();
            state.ensure_live()?;
            state.disposed = true;
            state.shutdown = true;
            std::mem::take(&mut state.items)
        };
        self.condvar.notify_all();

        if !discarded.is_empty() {
            debug!(discarded = discarded.len(), "handoff queue disposed with unclaimed items");
        }
        // Items are dropped here, outside the lock.
        drop(discarded);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    fn queue() -> Arc<HandoffQueue<u32>> {
        Arc::new(HandoffQueue::new())
    }

    #[test]
    fn peek_returns_items_in_fifo_order() {
        let queue = queue();
        for n in 0..5 {
            queue.add_item(Arc::new(n)).unwrap();
        }

        let taken: Vec<u32> = (0..5).map(|_| *queue.peek().unwrap().unwrap()).collect();
        assert_eq!(taken, vec![0, 1, 2, 3, 4]);
        assert_eq!(queue.pending().unwrap(), 0);
    }

    #[test]
    fn peek_blocks_until_item_added() {
        let queue = queue();
        let (tx, rx) = mpsc::channel();

        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || tx.send(queue.peek()).unwrap())
        };

        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
        queue.add_item(Arc::new(42)).unwrap();

        let taken = rx.recv_timeout(Duration::from_secs(5)).unwrap().unwrap();
        assert_eq!(taken.as_deref(), Some(&42));
        consumer.join().unwrap();
    }

    #[test]
    fn release_unblocks_waiting_peek() {
        let queue = queue();
        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.peek())
        };

        thread::sleep(Duration::from_millis(50));
        queue.release_reader().unwrap();

        assert_eq!(consumer.join().unwrap(), Ok(None));
    }

    #[test]
    fn release_takes_precedence_over_pending_items() {
        let queue = queue();
        queue.add_item(Arc::new(1)).unwrap();
        queue.release_reader().unwrap();

        assert_eq!(queue.peek(), Ok(None));
        assert_eq!(queue.pending().unwrap(), 1);
    }

    #[test]
    fn release_is_idempotent_and_refuses_new_items() {
        let queue = queue();
        queue.release_reader().unwrap();
        queue.release_reader().unwrap();

        assert!(queue.is_released());
        assert_eq!(
            queue.add_item(Arc::new(1)),
            Err(HandoffError::ReaderReleased)
        );
    }

    #[test]
    fn remove_item_matches_identity_not_value() {
        let queue = queue();
        let first = Arc::new(9);
        let second = Arc::new(9);
        queue.add_item(Arc::clone(&first)).unwrap();
        queue.add_item(Arc::clone(&second)).unwrap();

        assert_eq!(queue.remove_item(&second), Ok(true));

        let left = queue.peek().unwrap().unwrap();
        assert!(Arc::ptr_eq(&left, &first));
    }

    #[test]
    fn remove_item_after_claim_is_a_no_op() {
        let queue = queue();
        let item = Arc::new(1);
        queue.add_item(Arc::clone(&item)).unwrap();
        let claimed = queue.peek().unwrap().unwrap();

        assert_eq!(queue.remove_item(&claimed), Ok(false));
        assert_eq!(queue.remove_item(&item), Ok(false));
    }

    #[test]
    fn claimed_item_is_not_removable_while_others_wait() {
        let queue = queue();
        let first = Arc::new(1);
        queue.add_item(Arc::clone(&first)).unwrap();
        queue.add_item(Arc::new(2)).unwrap();
        let _claimed = queue.peek().unwrap().unwrap();

        assert_eq!(queue.pending(), Ok(1));
        assert_eq!(queue.remove_item(&first), Ok(false));
        assert_eq!(queue.pending(), Ok(1));
    }

    #[test]
    fn remove_item_keeps_other_items_available() {
        let queue = queue();
        let canceled = Arc::new(1);
        queue.add_item(Arc::clone(&canceled)).unwrap();
        queue.add_item(Arc::new(2)).unwrap();

        assert_eq!(queue.remove_item(&canceled), Ok(true));
        assert_eq!(queue.peek().unwrap().as_deref(), Some(&2));
    }

    #[test]
    fn dispose_discards_items() {
        let queue = queue();
        let item = Arc::new(5);
        queue.add_item(Arc::clone(&item)).unwrap();

        queue.dispose().unwrap();

        assert!(queue.is_disposed());
        // Only our handle is left; the queue's clone was dropped.
        assert_eq!(Arc::strong_count(&item), 1);
    }

    #[test]
    fn dispose_wakes_blocked_peek_with_error() {
        let queue = queue();
        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.peek())
        };

        thread::sleep(Duration::from_millis(50));
        queue.dispose().unwrap();

        assert_eq!(consumer.join().unwrap(), Err(HandoffError::Disposed));
    }

    #[derive(Debug, Clone, Copy)]
    enum Op {
        Add,
        Peek,
        Remove,
        Release,
        Dispose,
        Pending,
    }

    #[rstest]
    #[case::add(Op::Add)]
    #[case::peek(Op::Peek)]
    #[case::remove(Op::Remove)]
    #[case::release(Op::Release)]
    #[case::dispose(Op::Dispose)]
    #[case::pending(Op::Pending)]
    fn operations_after_dispose_fail_fast(#[case] op: Op) {
        let queue = queue();
        queue.dispose().unwrap();

        let result = match op {
            Op::Add => queue.add_item(Arc::new(1)),
            Op::Peek => queue.peek().map(|_| ()),
            Op::Remove => queue.remove_item(&Arc::new(1)).map(|_| ()),
            Op::Release => queue.release_reader(),
            Op::Dispose => queue.dispose(),
            Op::Pending => queue.pending().map(|_| ()),
        };
        assert_eq!(result, Err(HandoffError::Disposed));
    }
}
