//! Configuration types.
//!
//! This module defines the enums shared with command-line parsing and the
//! library-level [`Config`] used to build a [`crate::GeoDb`].

use std::path::PathBuf;

use clap::ValueEnum;

use crate::config::constants::{
    DEFAULT_STORE_DIR, DEFAULT_UPDATE_URL, DOWNLOAD_TIMEOUT_SECS, UPDATE_URL_ENV,
};

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Library configuration for a database store.
///
/// # Examples
///
/// ```no_run
/// use geolocate::Config;
/// use std::path::PathBuf;
///
/// let config = Config {
///     dir: PathBuf::from("/var/lib/geoip"),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the version marker and installed databases
    pub dir: PathBuf,

    /// Update source URL. `None` falls back to `GEO_DB`, then the built-in default.
    pub source_url: Option<String>,

    /// Overall deadline for one download, in seconds
    pub download_timeout_secs: u64,
}

impl Config {
    /// Resolves the update source: explicit value, then `GEO_DB`, then the default.
    pub fn resolve_source_url(&self) -> String {
        if let Some(url) = self.source_url.as_deref().filter(|u| !u.is_empty()) {
            return url.to_string();
        }
        match std::env::var(UPDATE_URL_ENV) {
            Ok(url) if !url.is_empty() => url,
            _ => DEFAULT_UPDATE_URL.to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_STORE_DIR),
            source_url: None,
            download_timeout_secs: DOWNLOAD_TIMEOUT_SECS,
        }
    }
}
