//! Error types for debounced calls and configuration

use thiserror::Error;

/// Why a debounced call settled without a value from its task
///
/// A task's own failure is never reported here: tasks that can fail return
/// `Result<V, E>` as their value, and that value is forwarded unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DebounceError {
    /// The window this call joined was cancelled, disposed, or its task
    /// panicked before producing a value
    #[error("debounced call was cancelled before its task ran")]
    Cancelled,

    /// The call was submitted after the debouncer was disposed
    #[error("debouncer has been disposed")]
    Disposed,
}

/// Configuration validation and parsing errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Delay is larger than the supported maximum
    #[error("delay_ms must be at most {max} (got {value})")]
    DelayOutOfRange { value: u64, max: u64 },

    /// `max_wait_ms` would close windows before `delay_ms` ever elapses
    #[error("max_wait_ms ({max_wait}) must be >= delay_ms ({delay})")]
    MaxWaitBelowDelay { max_wait: u64, delay: u64 },

    /// Config text could not be parsed
    #[error("invalid debounce config: {0}")]
    Parse(#[from] toml::de::Error),
}
