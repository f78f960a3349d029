//! Ports - the two sides of the handoff between submitters and the worker.

pub mod handoff;

pub use self::handoff::{HandoffReader, HandoffWriter};
