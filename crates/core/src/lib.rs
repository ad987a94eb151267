//! Trailing-debounce primitives for tokio
//!
//! This crate provides:
//! - `Debouncer`: collapse bursts of submissions into one execution of the last task
//! - `KeyedDebouncer`: an independent window per key (e.g. per path)
//! - `Coalescer`: collect every item pushed during a window into one batch
//! - `DebounceConfig`: delay / max-wait settings with validation

pub mod coalesce;
pub mod config;
pub mod debouncer;
pub mod error;
pub mod keyed;

// Re-exports
pub use coalesce::{Batch, Coalescer};
pub use config::DebounceConfig;
pub use debouncer::{Debounced, Debouncer};
pub use error::{ConfigError, DebounceError};
pub use keyed::KeyedDebouncer;

/// Result type for debounced calls
pub type Result<T, E = DebounceError> = std::result::Result<T, E>;
