//! CLI command implementations

pub mod config;
pub mod pipe;
pub mod watch;
