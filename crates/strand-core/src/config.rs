use std::env;

use serde::{Deserialize, Serialize};

use crate::domain::{DispatchError, Timeout};

pub const DEFAULT_THREAD_NAME: &str = "strand-worker";

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

/// Dispatcher configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Name given to the dedicated worker thread.
    pub thread_name: String,

    /// Claim timeout used by `send`; `None` waits forever.
    pub default_timeout_ms: Option<u64>,

    /// Worker stack size in bytes; `None` keeps the platform default.
    pub stack_size: Option<usize>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            thread_name: DEFAULT_THREAD_NAME.to_string(),
            default_timeout_ms: None,
            stack_size: None,
        }
    }
}

impl DispatcherConfig {
    /// Build config from `STRAND_*` environment variables (call `load_dotenv()` first).
    /// Missing or unparsable values fall back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();
        Self {
            thread_name: get("STRAND_THREAD_NAME").unwrap_or(defaults.thread_name),
            default_timeout_ms: get("STRAND_DEFAULT_TIMEOUT_MS")
                .and_then(|v| v.trim().parse().ok())
                .or(defaults.default_timeout_ms),
            stack_size: get("STRAND_STACK_SIZE")
                .and_then(|v| v.trim().parse().ok())
                .or(defaults.stack_size),
        }
    }

    pub fn default_timeout(&self) -> Timeout {
        Timeout::from_millis(self.default_timeout_ms)
    }

    /// Reject values the worker thread could not be spawned with.
    pub fn validate(&self) -> Result<(), DispatchError> {
        if self.thread_name.trim().is_empty() {
            return Err(DispatchError::InvalidConfig(
                "thread_name must not be empty".to_string(),
            ));
        }
        if self.thread_name.contains('\0') {
            return Err(DispatchError::InvalidConfig(
                "thread_name must not contain NUL bytes".to_string(),
            ));
        }
        if self.stack_size == Some(0) {
            return Err(DispatchError::InvalidConfig(
                "stack_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Dispatcher config:");
        tracing::info!("  thread_name:     {}", self.thread_name);
        match self.default_timeout_ms {
            Some(ms) => tracing::info!("  default_timeout: {ms}ms"),
            None => tracing::info!("  default_timeout: infinite"),
        }
        match self.stack_size {
            Some(bytes) => tracing::info!("  stack_size:      {bytes} bytes"),
            None => tracing::info!("  stack_size:      platform default"),
        }
    }
}
