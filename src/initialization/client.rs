//! HTTP client initialization.

use std::time::Duration;

use reqwest::ClientBuilder;

use crate::config::DOWNLOAD_CONNECT_TIMEOUT;
use crate::error_handling::InitializationError;

/// Initializes the HTTP client used to download database releases.
///
/// Creates a `reqwest::Client` configured with:
/// - A connect timeout (`DOWNLOAD_CONNECT_TIMEOUT`)
/// - An overall deadline covering the whole streamed body
/// - A crate-identifying User-Agent
/// - Rustls TLS backend (no native TLS)
///
/// # Errors
///
/// Returns `InitializationError::HttpClientError` if client creation fails.
pub fn init_client(download_timeout: Duration) -> Result<reqwest::Client, InitializationError> {
    let client = ClientBuilder::new()
        .connect_timeout(DOWNLOAD_CONNECT_TIMEOUT)
        .timeout(download_timeout)
        .user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ))
        .build()?;
    Ok(client)
}
