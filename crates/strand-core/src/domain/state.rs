//! Dispatcher lifecycle state.

use serde::{Deserialize, Serialize};

/// Dispatcher lifecycle.
///
/// State transitions:
/// - Created -> Running -> Stopping -> Stopped
/// - Created -> Stopped (stopped before it was ever started)
///
/// There is no restart: `Stopped` is terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatcherState {
    /// Constructed, worker thread not spawned yet.
    #[default]
    Created,

    /// Worker thread is running the loop.
    Running,

    /// Stop requested; waiting for the worker thread to exit.
    Stopping,

    /// Worker joined and queue disposed.
    Stopped,
}

impl DispatcherState {
    pub fn is_terminal(self) -> bool {
        matches!(self, DispatcherState::Stopped)
    }

    /// Is a stop already underway or done?
    pub fn is_shutting_down(self) -> bool {
        matches!(self, DispatcherState::Stopping | DispatcherState::Stopped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_stopped_is_terminal() {
        assert!(!DispatcherState::Created.is_terminal());
        assert!(!DispatcherState::Running.is_terminal());
        assert!(!DispatcherState::Stopping.is_terminal());
        assert!(DispatcherState::Stopped.is_terminal());
    }

    #[test]
    fn stopping_and_stopped_are_shutting_down() {
        assert!(!DispatcherState::Created.is_shutting_down());
        assert!(!DispatcherState::Running.is_shutting_down());
        assert!(DispatcherState::Stopping.is_shutting_down());
        assert!(DispatcherState::Stopped.is_shutting_down());
    }

    #[test]
    fn serializes_snake_case() {
        let json = serde_json::to_string(&DispatcherState::Stopping).unwrap();
        assert_eq!(json, "\"stopping\"");
    }
}
