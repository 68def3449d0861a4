//! Archive extraction.
//!
//! Streams the `.mmdb` entry out of a gzip-compressed tar archive straight into
//! the store directory. The entry is written to `<version>.mmdb.part` and only
//! renamed to `<version>.mmdb` once every byte is on disk, so a crash or a
//! failed download never leaves a truncated file under the final name.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use flate2::read::GzDecoder;
use tar::Archive;

use crate::config::{DB_ENTRY_SUFFIX, DB_EXTENSION, PARTIAL_EXTENSION};
use crate::error_handling::GeoError;
use crate::geoip::copy::{copy_with_progress, ProgressLog};
use crate::geoip::version::VersionStore;

/// Observer of cumulative bytes written while a database entry is extracted.
pub type ProgressFn = Arc<dyn Fn(u64) + Send + Sync>;

/// A database file fully written to the store but not yet recorded as current.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedDatabase {
    /// Version identifier derived from the entry's directory
    pub version: String,
    /// Final path, `<store-dir>/<version>.mmdb`
    pub path: PathBuf,
    /// Entry size in bytes
    pub size: u64,
}

/// Extracts the first regular-file `.mmdb` entry of a tar.gz stream into `store`.
///
/// # Errors
///
/// - [`GeoError::Archive`] if decompression or entry iteration fails
/// - [`GeoError::Transport`] if the underlying download breaks off mid-stream
/// - [`GeoError::MissingDatabaseEntry`] if the archive holds no `.mmdb` entry
/// - [`GeoError::AlreadyUpToDate`] if `<version>.mmdb` already exists with the entry's size
/// - [`GeoError::Io`] / [`GeoError::ShortWrite`] if writing the file fails
pub fn install_from_archive<R: Read>(
    archive: R,
    store: &VersionStore,
    progress: Option<&ProgressFn>,
) -> Result<StagedDatabase, GeoError> {
    log::debug!("Scanning update archive for a {} entry", DB_ENTRY_SUFFIX);

    let mut tar_archive = Archive::new(GzDecoder::new(archive));
    let entries = tar_archive.entries().map_err(GeoError::from_archive_read)?;

    for entry_result in entries {
        let mut entry = entry_result.map_err(GeoError::from_archive_read)?;
        let path = entry.path().map_err(GeoError::from_archive_read)?.into_owned();

        if !path.to_string_lossy().ends_with(DB_ENTRY_SUFFIX) {
            log::debug!("Skipping archive entry {:?}", path);
            continue;
        }
        let entry_type = entry.header().entry_type();
        if !entry_type.is_file() {
            log::debug!("Skipping {:?} entry {:?}, not a regular file", entry_type, path);
            continue;
        }

        let Some(version) = version_from_entry(&path) else {
            log::warn!("Cannot derive a version from archive entry {:?}", path);
            continue;
        };
        let size = entry.size();
        log::debug!("Found {:?} ({} bytes), version {}", path, size, version);

        return stage_entry(&mut entry, size, &version, store, progress);
    }

    Err(GeoError::MissingDatabaseEntry)
}

/// Version identifier for an archive entry: the name of its containing directory.
///
/// MaxMind archives look like `GeoLite2-City_20240102/GeoLite2-City.mmdb`. Entries
/// at the archive root (or under `.`/`..`) fall back to the file stem.
pub fn version_from_entry(path: &Path) -> Option<String> {
    path.parent()
        .and_then(Path::file_name)
        .or_else(|| path.file_stem())
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

fn stage_entry<R: Read>(
    entry: &mut R,
    size: u64,
    version: &str,
    store: &VersionStore,
    progress: Option<&ProgressFn>,
) -> Result<StagedDatabase, GeoError> {
    let dir = store.dir();
    std::fs::create_dir_all(dir)
        .map_err(|e| GeoError::io(format!("Failed to create store directory {:?}", dir), e))?;

    let target = store.database_path(version);
    match std::fs::metadata(&target) {
        Ok(meta) if meta.len() == size => {
            log::info!("Database {} already installed at {:?}", version, target);
            return Err(GeoError::AlreadyUpToDate(version.to_string()));
        }
        Ok(meta) => {
            log::info!(
                "Replacing stale {:?} ({} bytes on disk, {} in archive)",
                target,
                meta.len(),
                size
            );
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(GeoError::io(format!("Failed to inspect {:?}", target), e)),
    }

    let partial = target.with_extension(format!("{}.{}", DB_EXTENSION, PARTIAL_EXTENSION));
    let written = write_partial(entry, &partial, version, size, progress)
        .and_then(|copied| {
            std::fs::rename(&partial, &target).map_err(|e| {
                GeoError::io(format!("Failed to move {:?} into place", partial), e)
            })?;
            Ok(copied)
        });

    match written {
        Ok(copied) => {
            log::info!("Extracted {:?} ({} bytes)", target, copied);
            Ok(StagedDatabase {
                version: version.to_string(),
                path: target,
                size: copied,
            })
        }
        Err(e) => {
            remove_partial(&partial);
            Err(e)
        }
    }
}

fn write_partial<R: Read>(
    entry: &mut R,
    partial: &Path,
    version: &str,
    size: u64,
    progress: Option<&ProgressFn>,
) -> Result<u64, GeoError> {
    let mut file = File::create(partial)
        .map_err(|e| GeoError::io(format!("Failed to create {:?}", partial), e))?;

    let mut progress_log = ProgressLog::new(version, size);
    let mut report = |copied: u64| {
        progress_log.observe(copied);
        if let Some(cb) = progress {
            cb(copied);
        }
    };
    let copied = copy_with_progress(&mut file, entry, Some(&mut report))?;

    if copied != size {
        return Err(GeoError::Archive(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("archive entry truncated: {} of {} bytes", copied, size),
        )));
    }

    file.sync_all()
        .map_err(|e| GeoError::io(format!("Failed to flush {:?}", partial), e))?;
    Ok(copied)
}

fn remove_partial(partial: &Path) {
    match std::fs::remove_file(partial) {
        Ok(()) => log::debug!("Removed partial download {:?}", partial),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => log::warn!("Failed to remove partial download {:?}: {}", partial, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use std::sync::atomic::{AtomicU64, Ordering};
    use tar::Builder;
    use tempfile::TempDir;

    /// Creates a test tar.gz archive with the specified files.
    fn create_test_tar_gz(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut tar_builder = Builder::new(Vec::new());
        for (name, content) in files {
            let mut header = tar::Header::new_gnu();
            header.set_path(name).unwrap();
            header.set_size(content.len() as u64);
            header.set_cksum();
            tar_builder.append(&header, *content).unwrap();
        }
        let tar_bytes = tar_builder.into_inner().unwrap();

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&tar_bytes).unwrap();
        encoder.finish().unwrap()
    }

    fn store() -> (TempDir, VersionStore) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = VersionStore::new(temp_dir.path().join("geo_db"));
        (temp_dir, store)
    }

    #[test]
    fn test_install_nested_entry() {
        let (_tmp, store) = store();
        let content = b"fake mmdb content";
        let tar_gz = create_test_tar_gz(&[
            ("GeoLite2-City_20240102/COPYRIGHT.txt", b"copyright"),
            ("GeoLite2-City_20240102/GeoLite2-City.mmdb", content),
        ]);

        let staged = install_from_archive(tar_gz.as_slice(), &store, None).unwrap();

        assert_eq!(staged.version, "GeoLite2-City_20240102");
        assert_eq!(staged.size, content.len() as u64);
        assert_eq!(staged.path, store.database_path("GeoLite2-City_20240102"));
        assert_eq!(std::fs::read(&staged.path).unwrap(), content);
        assert!(!staged.path.with_extension("mmdb.part").exists());
    }

    #[test]
    fn test_install_reports_progress() {
        let (_tmp, store) = store();
        let content = vec![3u8; 4096];
        let tar_gz = create_test_tar_gz(&[("v1/db.mmdb", &content)]);
        let seen = Arc::new(AtomicU64::new(0));
        let seen_clone = Arc::clone(&seen);
        let progress: ProgressFn = Arc::new(move |n: u64| seen_clone.store(n, Ordering::SeqCst));

        install_from_archive(tar_gz.as_slice(), &store, Some(&progress)).unwrap();

        assert_eq!(seen.load(Ordering::SeqCst), 4096);
    }

    #[test]
    fn test_missing_database_entry() {
        let (_tmp, store) = store();
        let tar_gz = create_test_tar_gz(&[("GeoLite2-City_20240102/README.txt", b"readme")]);

        let result = install_from_archive(tar_gz.as_slice(), &store, None);
        assert!(matches!(result, Err(GeoError::MissingDatabaseEntry)));
    }

    #[test]
    fn test_empty_archive() {
        let (_tmp, store) = store();
        let tar_gz = create_test_tar_gz(&[]);

        let result = install_from_archive(tar_gz.as_slice(), &store, None);
        assert!(matches!(result, Err(GeoError::MissingDatabaseEntry)));
    }

    #[test]
    fn test_invalid_gzip() {
        let (_tmp, store) = store();
        let result = install_from_archive(&b"not a valid tar.gz file"[..], &store, None);
        assert!(matches!(result, Err(GeoError::Archive(_))));
    }

    #[test]
    fn test_corrupted_tar() {
        let (_tmp, store) = store();
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"not a valid tar file").unwrap();
        let corrupted_gz = encoder.finish().unwrap();

        let result = install_from_archive(corrupted_gz.as_slice(), &store, None);
        assert!(result.is_err());
        assert!(!result.unwrap_err().is_up_to_date());
    }

    #[test]
    fn test_same_size_is_up_to_date() {
        let (_tmp, store) = store();
        let content = b"fake mmdb content";
        let tar_gz = create_test_tar_gz(&[("v2024/GeoLite2-City.mmdb", content)]);

        install_from_archive(tar_gz.as_slice(), &store, None).unwrap();
        let before = std::fs::read(store.database_path("v2024")).unwrap();

        let again = install_from_archive(tar_gz.as_slice(), &store, None);
        match again {
            Err(GeoError::AlreadyUpToDate(version)) => assert_eq!(version, "v2024"),
            other => panic!("expected AlreadyUpToDate, got {:?}", other),
        }
        assert_eq!(std::fs::read(store.database_path("v2024")).unwrap(), before);
    }

    #[test]
    fn test_stale_file_is_replaced() {
        let (_tmp, store) = store();
        std::fs::create_dir_all(store.dir()).unwrap();
        std::fs::write(store.database_path("v2024"), b"old").unwrap();

        let content = b"the new, longer database";
        let tar_gz = create_test_tar_gz(&[("v2024/GeoLite2-City.mmdb", content)]);
        let staged = install_from_archive(tar_gz.as_slice(), &store, None).unwrap();

        assert_eq!(std::fs::read(staged.path).unwrap(), content);
    }

    #[test]
    fn test_truncated_stream_leaves_no_partial_file() {
        let (_tmp, store) = store();
        let content = vec![9u8; 64 * 1024];
        let tar_gz = create_test_tar_gz(&[("v7/GeoLite2-City.mmdb", &content)]);
        let truncated = &tar_gz[..tar_gz.len() / 2];

        let result = install_from_archive(truncated, &store, None);

        assert!(result.is_err());
        assert!(!store.database_path("v7").exists());
        assert!(!store.database_path("v7").with_extension("mmdb.part").exists());
    }

    #[test]
    fn test_first_database_entry_wins() {
        let (_tmp, store) = store();
        let tar_gz = create_test_tar_gz(&[
            ("first/GeoLite2-City.mmdb", b"city"),
            ("second/GeoLite2-ASN.mmdb", b"asn"),
        ]);

        let staged = install_from_archive(tar_gz.as_slice(), &store, None).unwrap();
        assert_eq!(staged.version, "first");
        assert!(!store.database_path("second").exists());
    }

    /// Appends a zero-length link entry called `name` pointing at `target`.
    fn append_link(builder: &mut Builder<Vec<u8>>, kind: tar::EntryType, name: &str, target: &str) {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(kind);
        header.set_path(name).unwrap();
        header.set_link_name(target).unwrap();
        header.set_size(0);
        header.set_cksum();
        builder.append(&header, std::io::empty()).unwrap();
    }

    fn gzip(tar_bytes: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(tar_bytes).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_link_entries_are_skipped() {
        let (_tmp, store) = store();
        let content = b"the real database";
        let mut builder = Builder::new(Vec::new());
        append_link(&mut builder, tar::EntryType::Symlink, "v1/GeoLite2-City.mmdb", "/etc/passwd");
        append_link(&mut builder, tar::EntryType::Link, "v2/GeoLite2-City.mmdb", "v1/GeoLite2-City.mmdb");
        let mut header = tar::Header::new_gnu();
        header.set_path("v3/GeoLite2-City.mmdb").unwrap();
        header.set_size(content.len() as u64);
        header.set_cksum();
        builder.append(&header, &content[..]).unwrap();
        let tar_gz = gzip(&builder.into_inner().unwrap());

        let staged = install_from_archive(tar_gz.as_slice(), &store, None).unwrap();

        assert_eq!(staged.version, "v3");
        assert_eq!(std::fs::read(&staged.path).unwrap(), content);
        assert!(!store.database_path("v1").exists());
        assert!(!store.database_path("v2").exists());
    }

    #[test]
    fn test_only_link_entries_is_missing_database() {
        let (_tmp, store) = store();
        let mut builder = Builder::new(Vec::new());
        append_link(&mut builder, tar::EntryType::Symlink, "v1/GeoLite2-City.mmdb", "elsewhere.mmdb");
        let tar_gz = gzip(&builder.into_inner().unwrap());

        let result = install_from_archive(tar_gz.as_slice(), &store, None);

        assert!(matches!(result, Err(GeoError::MissingDatabaseEntry)));
        assert!(!store.database_path("v1").exists());
    }

    #[test]
    fn test_version_from_entry() {
        assert_eq!(
            version_from_entry(Path::new("GeoLite2-City_20240102/GeoLite2-City.mmdb")).as_deref(),
            Some("GeoLite2-City_20240102")
        );
        assert_eq!(
            version_from_entry(Path::new("a/b/GeoLite2-City.mmdb")).as_deref(),
            Some("b")
        );
        assert_eq!(
            version_from_entry(Path::new("GeoLite2-City.mmdb")).as_deref(),
            Some("GeoLite2-City")
        );
        assert_eq!(
            version_from_entry(Path::new("../GeoLite2-City.mmdb")).as_deref(),
            Some("GeoLite2-City")
        );
    }
}
