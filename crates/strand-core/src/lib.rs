//! strand-core
//!
//! Marshals closures from any thread onto one dedicated worker thread.
//! Everything submitted runs serially, in submission order, on that thread.
//!
//! # モジュール構成
//! - **domain**: WorkItem, Signal, Timeout, DispatcherState, errors
//! - **ports**: HandoffReader / HandoffWriter（worker 側 / submitter 側）
//! - **impls**: HandoffQueue（Mutex + Condvar）
//! - **app**: Dispatcher, DispatchContext, ContextBuilder, status
//! - **config**: DispatcherConfig（env / serde）

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;

pub use app::{ContextBuilder, DispatchContext, DispatcherStatus, SendOutcome};
pub use config::{DispatcherConfig, load_dotenv};
pub use domain::{DispatchError, DispatcherState, HandoffError, SendError, Timeout};
