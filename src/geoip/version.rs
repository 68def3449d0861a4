//! Installed-version marker.
//!
//! The store directory holds a marker file naming the installed release and one
//! `<version>.mmdb` file per downloaded release. The marker is only rewritten
//! after the matching database file is complete on disk.

use std::io;
use std::path::{Path, PathBuf};

use crate::config::{DB_EXTENSION, VERSION_MARKER};
use crate::error_handling::GeoError;

/// Reads and writes the installed-version marker of a store directory.
///
/// There is no locking; the updater is the only writer.
#[derive(Debug, Clone)]
pub struct VersionStore {
    dir: PathBuf,
}

impl VersionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn marker_path(&self) -> PathBuf {
        self.dir.join(VERSION_MARKER)
    }

    /// Path of the database file for `version`: `<dir>/<version>.mmdb`.
    pub fn database_path(&self, version: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", version, DB_EXTENSION))
    }

    /// Records `version` as installed.
    ///
    /// The directory must already exist; a missing or read-only directory is an
    /// [`GeoError::Io`].
    pub async fn set_version(&self, version: &str) -> Result<(), GeoError> {
        let marker = self.marker_path();
        tokio::fs::write(&marker, version.as_bytes())
            .await
            .map_err(|e| GeoError::io(format!("Failed to write version marker {:?}", marker), e))?;
        log::debug!("Recorded installed version {}", version);
        Ok(())
    }

    /// Returns the installed version.
    ///
    /// A missing or empty marker is [`GeoError::NotInstalled`].
    pub async fn get_version(&self) -> Result<String, GeoError> {
        let marker = self.marker_path();
        let content = match tokio::fs::read_to_string(&marker).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(GeoError::NotInstalled),
            Err(e) => {
                return Err(GeoError::io(
                    format!("Failed to read version marker {:?}", marker),
                    e,
                ))
            }
        };

        let version = content.trim_end_matches(['\r', '\n']);
        if version.is_empty() {
            return Err(GeoError::NotInstalled);
        }
        Ok(version.to_string())
    }
}
