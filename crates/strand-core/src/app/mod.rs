//! App - ports と impls を組み合わせた実行層
//!
//! # 主要コンポーネント
//! - **Dispatcher**: worker thread とそのライフサイクル
//! - **DispatchContext**: 同期 submission の入口 (send / try_send / send_async)
//! - **ContextBuilder**: 構築と起動時検証
//! - **Status**: カウンタのスナップショット

pub mod builder;
pub mod context;
pub mod dispatcher;
pub mod status;

pub use self::builder::ContextBuilder;
pub use self::context::{DispatchContext, SendOutcome};
pub use self::dispatcher::Dispatcher;
pub use self::status::DispatcherStatus;
