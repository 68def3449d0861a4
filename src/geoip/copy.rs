//! Chunked stream copy with progress reporting.

use std::io::{self, Read, Write};

use crate::config::{COPY_BUFFER_SIZE, PROGRESS_LOG_STEPS};
use crate::error_handling::GeoError;

/// Copies `src` into `dst` until end of stream, returning the bytes copied.
///
/// `progress` receives the cumulative byte count after every successful write,
/// inline on the calling thread. A write that accepts fewer bytes than were read
/// fails with [`GeoError::ShortWrite`] and nothing further is read. Read errors
/// surface as [`GeoError::Archive`] since the source is always an archive entry,
/// unless the download itself failed ([`GeoError::Transport`]). Write errors
/// surface as [`GeoError::Io`].
pub fn copy_with_progress<R, W>(
    dst: &mut W,
    src: &mut R,
    mut progress: Option<&mut dyn FnMut(u64)>,
) -> Result<u64, GeoError>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut buf = vec![0u8; COPY_BUFFER_SIZE];
    let mut copied: u64 = 0;

    loop {
        let read = match src.read(&mut buf) {
            Ok(0) => return Ok(copied),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(GeoError::from_archive_read(e)),
        };

        let written = dst
            .write(&buf[..read])
            .map_err(|e| GeoError::io("Failed to write database file", e))?;
        if written != read {
            return Err(GeoError::ShortWrite {
                expected: read,
                written,
            });
        }

        copied += written as u64;
        if let Some(cb) = progress.as_deref_mut() {
            cb(copied);
        }
    }
}

/// Logs download progress each time another tenth of `total` bytes is written.
#[derive(Debug)]
pub struct ProgressLog {
    label: String,
    total: u64,
    next_step: u64,
}

impl ProgressLog {
    pub fn new(label: impl Into<String>, total: u64) -> Self {
        Self {
            label: label.into(),
            total,
            next_step: 1,
        }
    }

    /// Records the cumulative byte count, logging when a step boundary is crossed.
    pub fn observe(&mut self, copied: u64) {
        if self.total == 0 {
            return;
        }
        let step = copied.saturating_mul(PROGRESS_LOG_STEPS) / self.total;
        if step >= self.next_step {
            log::info!(
                "Downloading {}: {}% ({} / {} bytes)",
                self.label,
                step.min(PROGRESS_LOG_STEPS) * 100 / PROGRESS_LOG_STEPS,
                copied,
                self.total
            );
            self.next_step = step + 1;
        }
    }

    /// Last step reported so far, in tenths.
    pub fn steps_logged(&self) -> u64 {
        self.next_step - 1
    }
}
