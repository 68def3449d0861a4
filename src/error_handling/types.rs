//! Error type definitions.
//!
//! This module defines the error types surfaced by the database lifecycle,
//! the lookup engine and process initialization.

use std::io;
use std::net::IpAddr;

use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use reqwest::StatusCode;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing the HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),
}

/// Errors raised while installing, opening or querying the GeoIP database.
///
/// None of these are retried internally; each surfaces to the immediate caller.
#[derive(Error, Debug)]
pub enum GeoError {
    /// The download request could not be sent or its body could not be read.
    #[error("Failed to download database: {0}")]
    Transport(#[from] ReqwestError),

    /// The update source answered with something other than 200 OK.
    #[error("Database download failed: HTTP {0}")]
    HttpStatus(StatusCode),

    /// Decompression or archive-entry iteration failed.
    #[error("Invalid database archive: {0}")]
    Archive(#[source] io::Error),

    /// The archive was read to the end without a `.mmdb` entry.
    #[error("No database file found in update source")]
    MissingDatabaseEntry,

    /// The archived database is already installed with the same size.
    ///
    /// Not a failure for callers that only want "the newest database is
    /// installed"; see [`GeoError::is_up_to_date`].
    #[error("Database {0} is already up to date")]
    AlreadyUpToDate(String),

    /// No version marker has been written yet.
    #[error("No database installed yet")]
    NotInstalled,

    /// Filesystem read, write, rename, remove or mkdir failure.
    #[error("{context}: {source}")]
    Io {
        /// What was being attempted
        context: String,
        /// Underlying OS error
        #[source]
        source: io::Error,
    },

    /// The destination accepted fewer bytes than were offered.
    #[error("Short write: {written} of {expected} bytes written")]
    ShortWrite {
        /// Bytes offered to the destination
        expected: usize,
        /// Bytes the destination accepted
        written: usize,
    },

    /// A lookup ran while no database handle was open.
    #[error("Database is updating, retry later")]
    DatabaseUnavailable,

    /// The address is neither IPv4 nor IPv4-mapped IPv6.
    #[error("{0} is not an IPv4 address")]
    UnsupportedAddressFamily(IpAddr),

    /// The input could not be parsed as an IP address.
    #[error("Invalid IP address: {0:?}")]
    InvalidAddress(String),

    /// Error reported verbatim by the database decoder.
    #[error("{0}")]
    Decode(String),

    /// Another update holds the single-update guard.
    #[error("An update is already in progress")]
    UpdateInProgress,

    /// The update task ended without reporting an outcome.
    #[error("Update task aborted: {0}")]
    UpdateAborted(String),
}

impl GeoError {
    /// Builds an [`GeoError::Io`] with a description of the failed operation.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        GeoError::Io {
            context: context.into(),
            source,
        }
    }

    /// Classifies a read failure on the archive stream.
    ///
    /// The download body reaches the decoder as an `io::Error` wrapping a
    /// `reqwest::Error`. Those are unwrapped back into [`GeoError::Transport`];
    /// everything else is an [`GeoError::Archive`] failure.
    pub fn from_archive_read(e: io::Error) -> Self {
        if !e.get_ref().is_some_and(|inner| inner.is::<ReqwestError>()) {
            return GeoError::Archive(e);
        }
        let kind = e.kind();
        match e.into_inner().map(|inner| inner.downcast::<ReqwestError>()) {
            Some(Ok(transport)) => GeoError::Transport(*transport),
            Some(Err(other)) => GeoError::Archive(io::Error::new(kind, other)),
            None => GeoError::Archive(io::Error::from(kind)),
        }
    }

    /// Returns true for the "already up to date" outcome of an update.
    pub fn is_up_to_date(&self) -> bool {
        matches!(self, GeoError::AlreadyUpToDate(_))
    }
}

impl From<maxminddb::MaxMindDbError> for GeoError {
    fn from(e: maxminddb::MaxMindDbError) -> Self {
        GeoError::Decode(e.to_string())
    }
}
