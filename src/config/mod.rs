//! Application configuration and constants.
//!
//! This module provides:
//! - Configuration constants (update source, on-disk layout, timeouts)
//! - Logging option types shared with the CLI
//! - The library [`Config`]

mod constants;
mod types;

// Re-export all constants
pub use constants::*;
pub use types::{Config, LogFormat, LogLevel};
