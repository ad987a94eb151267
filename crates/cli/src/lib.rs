//! Library side of the `settle` CLI
//!
//! Exposes configuration loading so it can be tested without the binary.

pub mod config;

pub use config::SettleConfig;
