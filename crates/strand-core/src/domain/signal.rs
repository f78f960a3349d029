//! Manual-reset, set-once signal.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use super::Timeout;

/// A flag that can be waited on.
///
/// Once [`set`](Signal::set) it stays set forever, so any number of threads
/// may wait on it or observe it without further coordination.
#[derive(Debug, Default)]
pub struct Signal {
    set: Mutex<bool>,
    condvar: Condvar,
}

impl Signal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the signal and wake every waiter. Setting twice is a no-op.
    pub fn set(&self) {
        let mut set = self.lock();
        if !*set {
            *set = true;
            self.condvar.notify_all();
        }
    }

    pub fn is_set(&self) -> bool {
        *self.lock()
    }

    /// Block until the signal is set.
    pub fn wait(&self) {
        let mut set = self.lock();
        while !*set {
            set = self
                .condvar
                .wait(set)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Block until the signal is set or `timeout` elapses.
    ///
    /// Returns `true` if the signal was set.
    pub fn wait_for(&self, timeout: Timeout) -> bool {
        let Some(duration) = timeout.as_duration() else {
            self.wait();
            return true;
        };
        // Durations too large to add to `now` are as good as infinite.
        let Some(deadline) = Instant::now().checked_add(duration) else {
            self.wait();
            return true;
        };

        let mut set = self.lock();
        while !*set {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self
                .condvar
                .wait_timeout(set, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            set = guard;
        }
        true
    }

    // The guarded bool cannot be left half-written, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, bool> {
        self.set.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn starts_unset() {
        let signal = Signal::new();
        assert!(!signal.is_set());
        assert!(!signal.wait_for(Timeout::IMMEDIATE));
    }

    #[test]
    fn stays_set() {
        let signal = Signal::new();
        signal.set();
        signal.set();
        assert!(signal.is_set());
        assert!(signal.wait_for(Timeout::IMMEDIATE));
        signal.wait();
    }

    #[test]
    fn wait_for_times_out() {
        let signal = Signal::new();
        let start = Instant::now();
        assert!(!signal.wait_for(Duration::from_millis(50).into()));
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn huge_timeout_behaves_like_infinite() {
        let signal = Signal::new();
        signal.set();
        assert!(signal.wait_for(Duration::MAX.into()));
    }

    #[test]
    fn set_wakes_all_waiters() {
        let signal = Arc::new(Signal::new());
        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let signal = Arc::clone(&signal);
                thread::spawn(move || signal.wait_for(Duration::from_secs(5).into()))
            })
            .collect();

        thread::sleep(Duration::from_millis(20));
        signal.set();

        for waiter in waiters {
            assert!(waiter.join().unwrap());
        }
    }
}
