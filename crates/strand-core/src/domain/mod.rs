//! Domain model: work items, their completion signals, lifecycle states and errors.

pub mod errors;
pub mod ids;
pub mod signal;
pub mod state;
pub mod timeout;
pub mod work_item;

pub use self::errors::{DispatchError, HandoffError, SendError};
pub use self::ids::WorkItemId;
pub use self::signal::Signal;
pub use self::state::DispatcherState;
pub use self::timeout::Timeout;
pub use self::work_item::{Fault, WorkItem};
