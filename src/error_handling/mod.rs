//! Error handling.
//!
//! Errors are split into:
//! - **Initialization errors**: logger and HTTP client setup
//! - **GeoIP errors**: download, archive, install and lookup failures

mod types;

// Re-export public API
pub use types::{GeoError, InitializationError};
