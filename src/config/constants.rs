//! Configuration constants.
//!
//! This module defines the constants used throughout the crate: update source,
//! on-disk layout, copy sizing, language fallback order and network timeouts.

use std::time::Duration;

/// Default update source (gzip-compressed tar containing a GeoLite2-City `.mmdb`).
pub const DEFAULT_UPDATE_URL: &str =
    "https://geolite.maxmind.com/download/geoip/database/GeoLite2-City.tar.gz";

/// Environment variable overriding the update source URL.
pub const UPDATE_URL_ENV: &str = "GEO_DB";

/// Name of the marker file holding the installed version identifier.
///
/// The spelling is part of the on-disk format and must not be corrected,
/// otherwise existing stores lose track of their installed release.
pub const VERSION_MARKER: &str = "lastest";

/// Extension of installed database files (`<store-dir>/<version>.mmdb`).
pub const DB_EXTENSION: &str = "mmdb";

/// Suffix identifying the database entry inside an update archive.
pub const DB_ENTRY_SUFFIX: &str = ".mmdb";

/// Extension used while an entry is being streamed to disk.
pub const PARTIAL_EXTENSION: &str = "part";

/// Default store directory name, created under `$HOME` by the binary.
pub const DEFAULT_STORE_DIR: &str = ".geoip";

/// Chunk size for streaming archive entries to disk (512KB)
pub const COPY_BUFFER_SIZE: usize = 512 * 1024;

/// Progress is logged each time another tenth of the entry has been written.
pub const PROGRESS_LOG_STEPS: u64 = 10;

/// Display-language priority used when the requested language is missing.
pub const LANGUAGE_FALLBACK: &[&str] = &["en", "zh-CN", "de", "es", "fr", "ja", "pt-BR", "ru"];

// Network operation timeouts
/// TCP connection timeout for the update source
pub const DOWNLOAD_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Overall deadline for one database download in seconds (5 minutes for a large file)
pub const DOWNLOAD_TIMEOUT_SECS: u64 = 300;

/// Service used to discover the caller's public address when none is given.
pub const PUBLIC_IP_URL: &str = "http://httpbin.org/ip";

// HTTP API
/// Default port for `geolocate serve`
pub const DEFAULT_HTTP_PORT: u16 = 12345;
/// Environment variable overriding the HTTP port
pub const HTTP_PORT_ENV: &str = "HTTP_PORT";
/// Default response language of the command-line lookup
pub const DEFAULT_LANGUAGE: &str = "zh-CN";
