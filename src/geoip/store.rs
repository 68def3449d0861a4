//! The database engine: owns the store directory and the current handle.

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use crate::config::Config;
use crate::error_handling::{GeoError, InitializationError};
use crate::geoip::extract::ProgressFn;
use crate::geoip::reader::{DatabaseOpener, GeoReader, MaxMindOpener};
use crate::geoip::types::DatabaseMetadata;
use crate::geoip::version::VersionStore;
use crate::initialization::init_client;

/// A versioned, self-updating GeoIP database.
///
/// `GeoDb` is the single owner of the current database handle. Lookups take a
/// snapshot `Arc` of the handle at call time, so an update swapping in a new
/// database never tears an in-flight lookup: it sees the old reader or the new
/// one. At most one update runs at a time.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use geolocate::{Config, GeoDb};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let db = Arc::new(GeoDb::new(&Config::default())?);
/// db.open().await?;
/// let result = db.find("8.8.8.8", "en")?;
/// println!("{}", result.summary());
/// # Ok(())
/// # }
/// ```
pub struct GeoDb {
    pub(crate) versions: VersionStore,
    pub(crate) source_url: String,
    pub(crate) client: reqwest::Client,
    opener: Arc<dyn DatabaseOpener>,
    pub(crate) progress: Option<ProgressFn>,
    current: RwLock<Option<Arc<dyn GeoReader>>>,
    pub(crate) update_guard: tokio::sync::Mutex<()>,
}

impl GeoDb {
    /// Creates an engine for `config` with no database open.
    ///
    /// # Errors
    ///
    /// Returns `InitializationError::HttpClientError` if the download client
    /// cannot be built.
    pub fn new(config: &Config) -> Result<Self, InitializationError> {
        let client = init_client(Duration::from_secs(config.download_timeout_secs))?;
        Ok(Self {
            versions: VersionStore::new(&config.dir),
            source_url: config.resolve_source_url(),
            client,
            opener: Arc::new(MaxMindOpener),
            progress: None,
            current: RwLock::new(None),
            update_guard: tokio::sync::Mutex::new(()),
        })
    }

    /// Replaces the database decoder.
    pub fn with_opener(mut self, opener: Arc<dyn DatabaseOpener>) -> Self {
        self.opener = opener;
        self
    }

    /// Registers an observer of extraction progress (cumulative bytes written).
    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn dir(&self) -> &Path {
        self.versions.dir()
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    /// Opens the installed database, downloading one first if needed.
    ///
    /// When the version marker is missing or names a file that does not exist,
    /// an update runs to completion before this returns and its failure is
    /// returned as is.
    pub async fn open(&self) -> Result<(), GeoError> {
        match self.versions.get_version().await {
            Ok(version) => {
                let path = self.versions.database_path(&version);
                match tokio::fs::try_exists(&path).await {
                    Ok(true) => {
                        log::info!("Opening installed database {} at {:?}", version, path);
                        let reader = self.open_reader(path).await?;
                        self.install_reader(reader);
                        return Ok(());
                    }
                    Ok(false) => {
                        log::warn!("Installed version {} has no file at {:?}", version, path)
                    }
                    Err(e) => log::warn!("Cannot check {:?}: {}", path, e),
                }
            }
            Err(GeoError::NotInstalled) => {
                log::info!("No database installed in {:?}", self.dir());
            }
            Err(e) => log::warn!("Cannot read installed version: {}", e),
        }

        self.bootstrap().await
    }

    /// Runs the first update synchronously.
    ///
    /// `AlreadyUpToDate` here means the file is on disk but the marker was
    /// lost, so the existing file is recorded and opened.
    async fn bootstrap(&self) -> Result<(), GeoError> {
        match self.run_update().await {
            Ok(version) => {
                log::info!("Bootstrapped database {}", version);
                Ok(())
            }
            Err(GeoError::AlreadyUpToDate(version)) => {
                log::info!("Adopting existing database {}", version);
                let reader = self
                    .open_reader(self.versions.database_path(&version))
                    .await?;
                self.versions.set_version(&version).await?;
                self.install_reader(reader);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Opens `path` with the configured decoder off the async runtime.
    pub(crate) async fn open_reader(&self, path: PathBuf) -> Result<Arc<dyn GeoReader>, GeoError> {
        let opener = Arc::clone(&self.opener);
        tokio::task::spawn_blocking(move || opener.open(&path))
            .await
            .map_err(|e| GeoError::UpdateAborted(format!("database open task failed: {}", e)))?
    }

    /// Makes `reader` the current handle and returns the previous one.
    ///
    /// The swap is a single assignment under the write lock; the previous
    /// reader closes once the last in-flight lookup drops its snapshot.
    pub fn install_reader(&self, reader: Arc<dyn GeoReader>) -> Option<Arc<dyn GeoReader>> {
        log_metadata(reader.metadata());
        self.current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(reader)
    }

    /// The current handle, if one is open.
    pub(crate) fn snapshot(&self) -> Option<Arc<dyn GeoReader>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_open(&self) -> bool {
        self.snapshot().is_some()
    }

    /// Releases the current handle. Lookups fail with
    /// [`GeoError::DatabaseUnavailable`] until the next open or update.
    pub fn close(&self) {
        let previous = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if previous.is_some() {
            log::debug!("Closed database handle");
        }
    }

    /// Metadata of the open database.
    pub fn metadata(&self) -> Result<DatabaseMetadata, GeoError> {
        self.snapshot()
            .map(|reader| reader.metadata().clone())
            .ok_or(GeoError::DatabaseUnavailable)
    }

    /// Languages the open database carries names for.
    pub fn languages(&self) -> Result<Vec<String>, GeoError> {
        self.snapshot()
            .map(|reader| reader.metadata().languages.clone())
            .ok_or(GeoError::DatabaseUnavailable)
    }

    /// Build version of the open database, `v<major>.<minor>.<build_epoch>`.
    pub fn database_version(&self) -> Result<String, GeoError> {
        self.snapshot()
            .map(|reader| reader.metadata().version_string())
            .ok_or(GeoError::DatabaseUnavailable)
    }

    /// Version identifier recorded in the store's marker file.
    pub async fn installed_version(&self) -> Result<String, GeoError> {
        self.versions.get_version().await
    }
}

fn log_metadata(metadata: &DatabaseMetadata) {
    log::debug!(
        "Database {} {}: {} nodes, IPv{}, languages {:?}",
        metadata.database_type,
        metadata.version_string(),
        metadata.node_count,
        metadata.ip_version,
        metadata.languages
    );
    for (lang, text) in &metadata.description {
        log::debug!("Database description [{}]: {}", lang, text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geoip::types::CityRecord;
    use std::net::IpAddr;
    use tempfile::TempDir;

    struct StaticReader(DatabaseMetadata);

    impl GeoReader for StaticReader {
        fn city(&self, _ip: IpAddr) -> Result<CityRecord, GeoError> {
            Ok(CityRecord::default())
        }

        fn metadata(&self) -> &DatabaseMetadata {
            &self.0
        }
    }

    fn reader(epoch: u64) -> Arc<dyn GeoReader> {
        Arc::new(StaticReader(DatabaseMetadata {
            languages: vec!["en".to_string(), "zh-CN".to_string()],
            binary_format_major_version: 2,
            build_epoch: epoch,
            database_type: "GeoLite2-City".to_string(),
            ..Default::default()
        }))
    }

    fn engine(dir: &Path) -> GeoDb {
        let config = Config {
            dir: dir.to_path_buf(),
            source_url: Some("http://127.0.0.1:9/unused.tar.gz".to_string()),
            ..Default::default()
        };
        GeoDb::new(&config).expect("Failed to build engine")
    }

    #[test]
    fn test_metadata_requires_open_handle() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db = engine(temp_dir.path());

        assert!(!db.is_open());
        assert!(matches!(db.languages(), Err(GeoError::DatabaseUnavailable)));
        assert!(matches!(
            db.database_version(),
            Err(GeoError::DatabaseUnavailable)
        ));
    }

    #[test]
    fn test_install_reader_swaps_handle() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db = engine(temp_dir.path());

        assert!(db.install_reader(reader(1)).is_none());
        assert_eq!(db.database_version().unwrap(), "v2.0.1");

        let previous = db.install_reader(reader(2)).expect("previous handle");
        assert_eq!(previous.metadata().build_epoch, 1);
        assert_eq!(db.database_version().unwrap(), "v2.0.2");
        assert_eq!(db.languages().unwrap(), vec!["en", "zh-CN"]);
    }

    #[test]
    fn test_snapshot_survives_swap() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db = engine(temp_dir.path());
        db.install_reader(reader(1));

        let held = db.snapshot().expect("handle");
        db.install_reader(reader(2));

        assert_eq!(held.metadata().build_epoch, 1);
        assert_eq!(db.snapshot().unwrap().metadata().build_epoch, 2);
    }

    #[test]
    fn test_close_releases_handle() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db = engine(temp_dir.path());
        db.install_reader(reader(1));

        db.close();
        assert!(!db.is_open());
        // closing twice is harmless
        db.close();
    }

    #[tokio::test]
    async fn test_open_with_marker_and_unreadable_file_fails() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db = engine(temp_dir.path());
        db.versions.set_version("v1").await.unwrap();
        std::fs::write(db.versions.database_path("v1"), b"garbage").unwrap();

        let result = db.open().await;
        assert!(matches!(result, Err(GeoError::Decode(_))));
        assert!(!db.is_open());
    }
}
