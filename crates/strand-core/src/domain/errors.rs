//! Error types.
//!
//! A timeout is not an error: it surfaces as `SendOutcome::Canceled` or
//! `SendOutcome::Detached`. Faults raised by an action are not wrapped here
//! either; panics are re-raised on the submitting thread and `Err` values
//! come back through [`SendError::Action`] untouched.

use thiserror::Error;

use super::{DispatcherState, WorkItemId};

/// Errors from the handoff queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HandoffError {
    #[error("handoff queue has been disposed")]
    Disposed,

    #[error("handoff queue reader has been released; no new items are accepted")]
    ReaderReleased,
}

/// Errors from the dispatcher and the submission entry points.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("dispatcher cannot do that from state {0:?}")]
    InvalidState(DispatcherState),

    #[error("dispatcher cannot be stopped from its own worker thread")]
    StopFromWorker,

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("worker thread panicked outside of a work item")]
    WorkerPanicked,

    #[error("invalid dispatcher config: {0}")]
    InvalidConfig(String),

    #[error("work item {0} completed without storing its result")]
    MissingResult(WorkItemId),

    #[error("blocking submission task failed: {0}")]
    Bridge(String),

    #[error(transparent)]
    Handoff(#[from] HandoffError),
}

impl DispatchError {
    /// True when the submission was refused or abandoned because the
    /// dispatcher is shutting down or already gone.
    pub fn is_shutdown(&self) -> bool {
        matches!(
            self,
            DispatchError::Handoff(HandoffError::Disposed | HandoffError::ReaderReleased)
        )
    }
}

/// Error of [`DispatchContext::try_send`](crate::app::DispatchContext::try_send).
#[derive(Debug, Error)]
pub enum SendError<E> {
    /// The action ran on the worker and returned this error.
    #[error("action failed: {0}")]
    Action(E),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl<E> SendError<E> {
    pub fn into_action_error(self) -> Option<E> {
        match self {
            SendError::Action(error) => Some(error),
            SendError::Dispatch(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shutdown_errors_are_recognized() {
        assert!(DispatchError::from(HandoffError::Disposed).is_shutdown());
        assert!(DispatchError::from(HandoffError::ReaderReleased).is_shutdown());
        assert!(!DispatchError::StopFromWorker.is_shutdown());
    }

    #[test]
    fn missing_result_names_the_item() {
        let id = WorkItemId::next();
        let err = DispatchError::MissingResult(id);
        assert_eq!(
            err.to_string(),
            format!("work item {id} completed without storing its result")
        );
        assert!(!err.is_shutdown());
    }

    #[test]
    fn action_error_is_returned_as_is() {
        let err: SendError<&str> = SendError::Action("nope");
        assert_eq!(err.to_string(), "action failed: nope");
        assert_eq!(err.into_action_error(), Some("nope"));
    }

    #[test]
    fn dispatch_error_is_transparent() {
        let err: SendError<String> = DispatchError::from(HandoffError::Disposed).into();
        assert_eq!(err.to_string(), "handoff queue has been disposed");
        assert!(err.into_action_error().is_none());
    }
}
