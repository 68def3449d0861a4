//! GeoIP database lifecycle and lookup.
//!
//! This module keeps a local MaxMind GeoLite2-City database up to date and
//! resolves addresses against it:
//! - `version`: the installed-version marker
//! - `copy`: chunked stream copy with progress
//! - `extract`: streamed tar.gz extraction into the store
//! - `reader`: the decoder interface and its `maxminddb` implementation
//! - `store`, `update`, `lookup`: the [`GeoDb`] engine

mod copy;
mod extract;
mod locale;
mod lookup;
mod reader;
mod store;
mod types;
mod update;
mod version;

// Re-export public API
pub use copy::{copy_with_progress, ProgressLog};
pub use extract::{install_from_archive, version_from_entry, ProgressFn, StagedDatabase};
pub use locale::localized_name;
pub use lookup::classify;
pub use reader::{DatabaseOpener, GeoReader, MaxMindOpener, MaxMindReader};
pub use store::GeoDb;
pub use types::{CityRecord, DatabaseMetadata, GeoResult, Name, Place, ResultCode};
pub use update::{await_update, UpdateOutcome};
pub use version::VersionStore;
