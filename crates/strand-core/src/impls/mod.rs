//! Impls - implementations of the ports.
//!
//! # 含まれる実装
//! - **HandoffQueue**: Mutex + Condvar による blocking queue

pub mod handoff_queue;

pub use self::handoff_queue::HandoffQueue;
