//! geolocate library: IP geolocation over a self-updating local database
//!
//! This library keeps a MaxMind GeoLite2-City database installed in a local
//! store directory, updates it from a remote tar.gz release without
//! interrupting lookups, and resolves IPv4 addresses to localized continent,
//! country and city names.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use geolocate::{await_update, Config, GeoDb};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config {
//!     dir: std::path::PathBuf::from("/var/lib/geoip"),
//!     ..Default::default()
//! };
//!
//! let db = Arc::new(GeoDb::new(&config)?);
//! db.open().await?;
//!
//! let result = db.find("8.8.8.8", "en")?;
//! println!("{}", result.summary());
//!
//! // refresh in the background; lookups keep working meanwhile
//! match await_update(db.update()).await {
//!     Ok(version) => println!("installed {}", version),
//!     Err(e) if e.is_up_to_date() => println!("already current"),
//!     Err(e) => eprintln!("update failed: {}", e),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your application
//! or ensure you're calling library functions within an async context.

pub mod config;
mod error_handling;
pub mod geoip;
pub mod initialization;
pub mod server;

// Re-export public API
pub use config::{Config, LogFormat, LogLevel};
pub use error_handling::{GeoError, InitializationError};
pub use geoip::{await_update, GeoDb, GeoResult, Name, ResultCode, UpdateOutcome};
