//! ContextBuilder - DispatchContext の構築
//!
//! 起動時検証（Fail-fast）: config が不正なら worker thread を作らずにエラーを返す。

use super::DispatchContext;
use crate::config::DispatcherConfig;
use crate::domain::{DispatchError, Timeout};

/// Builds a [`DispatchContext`].
///
/// # 使用例
/// ```
/// use std::time::Duration;
/// use strand_core::ContextBuilder;
///
/// let context = ContextBuilder::new()
///     .thread_name("render-thread")
///     .default_timeout(Duration::from_secs(2))
///     .build()
///     .unwrap();
/// # context.shutdown().unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct ContextBuilder {
    config: DispatcherConfig,
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing config (for example `DispatcherConfig::from_env()`).
    pub fn from_config(config: DispatcherConfig) -> Self {
        Self { config }
    }

    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.config.thread_name = name.into();
        self
    }

    /// Claim timeout used by `send`.
    pub fn default_timeout(mut self, timeout: impl Into<Timeout>) -> Self {
        self.config.default_timeout_ms = timeout
            .into()
            .as_duration()
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.config.stack_size = Some(bytes);
        self
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Validate the config and start the worker thread.
    pub fn build(self) -> Result<DispatchContext, DispatchError> {
        DispatchContext::with_config(self.config)
    }
}
