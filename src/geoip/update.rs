//! Database updates.
//!
//! An update downloads the configured archive, streams its `.mmdb` entry into
//! the store, records the new version and swaps the open handle, in that
//! order. Any failure before the swap leaves the previous handle and recorded
//! version in place. A staged file that cannot be opened or recorded is removed
//! again, so the next update downloads it afresh instead of matching its size.

use std::io;
use std::path::Path;
use std::sync::Arc;

use futures::TryStreamExt;
use reqwest::StatusCode;
use tokio::sync::oneshot;
use tokio_util::io::{StreamReader, SyncIoBridge};

use crate::error_handling::GeoError;
use crate::geoip::extract::{install_from_archive, StagedDatabase};
use crate::geoip::store::GeoDb;

/// Terminal outcome of one update: the installed version, or why it failed.
///
/// [`GeoError::AlreadyUpToDate`] is reported as an error; use
/// [`GeoError::is_up_to_date`] to treat it as success.
pub type UpdateOutcome = Result<String, GeoError>;

impl GeoDb {
    /// Starts an update in the background and returns immediately.
    ///
    /// The outcome is delivered exactly once through the returned receiver.
    /// Dropping the receiver does not cancel the update. If another update is
    /// running, this one fails with [`GeoError::UpdateInProgress`].
    pub fn update(self: &Arc<Self>) -> oneshot::Receiver<UpdateOutcome> {
        let (tx, rx) = oneshot::channel();
        let db = Arc::clone(self);

        tokio::spawn(async move {
            let outcome = db.run_update().await;
            match &outcome {
                Ok(version) => log::info!("Update finished: installed {}", version),
                Err(e) if e.is_up_to_date() => log::info!("Update finished: {}", e),
                Err(e) => log::warn!("Update failed: {}", e),
            }
            if tx.send(outcome).is_err() {
                log::debug!("Update outcome dropped, receiver went away");
            }
        });

        rx
    }

    /// Runs the full update on the calling task.
    pub(crate) async fn run_update(&self) -> UpdateOutcome {
        let _guard = self
            .update_guard
            .try_lock()
            .map_err(|_| GeoError::UpdateInProgress)?;

        log::info!("Downloading database from {}", self.source_url);
        let response = self.client.get(&self.source_url).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(GeoError::HttpStatus(status));
        }
        if let Some(len) = response.content_length() {
            log::debug!("Update archive is {} bytes", len);
        }

        let staged = self.stage_download(response).await?;

        if let Err(e) = self.commit(&staged).await {
            discard_staged(&staged.path).await;
            return Err(e);
        }
        log::info!("Installed database {} ({} bytes)", staged.version, staged.size);

        Ok(staged.version)
    }

    /// Opens the staged file, records its version and swaps the handle.
    async fn commit(&self, staged: &StagedDatabase) -> Result<(), GeoError> {
        let reader = self.open_reader(staged.path.clone()).await?;
        self.versions.set_version(&staged.version).await?;
        self.install_reader(reader);
        Ok(())
    }

    /// Streams the response body through decompression and extraction.
    ///
    /// The body is never buffered whole: chunks flow from the socket into the
    /// gzip decoder on a blocking thread as the tar reader asks for them.
    async fn stage_download(
        &self,
        response: reqwest::Response,
    ) -> Result<StagedDatabase, GeoError> {
        let body = response.bytes_stream().map_err(io::Error::other);
        // SyncIoBridge captures the runtime handle, so build it here, not on the blocking thread
        let archive = SyncIoBridge::new(StreamReader::new(Box::pin(body)));
        let store = self.versions.clone();
        let progress = self.progress.clone();

        tokio::task::spawn_blocking(move || install_from_archive(archive, &store, progress.as_ref()))
            .await
            .map_err(|e| GeoError::UpdateAborted(format!("extraction task failed: {}", e)))?
    }
}

async fn discard_staged(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => log::info!("Removed rejected database {:?}", path),
        Err(e) => log::warn!("Failed to remove rejected database {:?}: {}", path, e),
    }
}

/// Waits for the outcome of [`GeoDb::update`].
pub async fn await_update(rx: oneshot::Receiver<UpdateOutcome>) -> UpdateOutcome {
    rx.await
        .map_err(|_| GeoError::UpdateAborted("update task ended without an outcome".to_string()))?
}
