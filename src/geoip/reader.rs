//! Database readers.
//!
//! The lookup engine never interprets the binary format itself. It talks to an
//! open database through [`GeoReader`] and opens files through
//! [`DatabaseOpener`]; [`MaxMindOpener`] is the implementation used in
//! production, backed by the `maxminddb` crate.

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;

use maxminddb::{geoip2, Reader};

use super::types::{CityRecord, DatabaseMetadata, Place};
use crate::error_handling::GeoError;

/// An open, read-only database bound to one file for its whole lifetime.
///
/// Dropping the last reference closes it.
pub trait GeoReader: Send + Sync {
    /// Resolves `ip` to its city-level record. Addresses without a record
    /// resolve to an empty [`CityRecord`].
    fn city(&self, ip: IpAddr) -> Result<CityRecord, GeoError>;

    fn metadata(&self) -> &DatabaseMetadata;
}

/// Opens database files into readers.
pub trait DatabaseOpener: Send + Sync {
    fn open(&self, path: &Path) -> Result<Arc<dyn GeoReader>, GeoError>;
}

/// Opens MaxMind DB (`.mmdb`) files.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxMindOpener;

impl DatabaseOpener for MaxMindOpener {
    fn open(&self, path: &Path) -> Result<Arc<dyn GeoReader>, GeoError> {
        log::debug!("Opening MaxMind database {:?}", path);
        let reader = Reader::open_readfile(path)?;
        Ok(Arc::new(MaxMindReader::new(reader)))
    }
}

/// A MaxMind GeoIP2/GeoLite2 City database loaded in memory.
pub struct MaxMindReader {
    reader: Reader<Vec<u8>>,
    metadata: DatabaseMetadata,
}

impl MaxMindReader {
    pub fn new(reader: Reader<Vec<u8>>) -> Self {
        let meta = &reader.metadata;
        let metadata = DatabaseMetadata {
            languages: meta.languages.clone(),
            description: meta.description.clone(),
            binary_format_major_version: meta.binary_format_major_version,
            binary_format_minor_version: meta.binary_format_minor_version,
            build_epoch: meta.build_epoch,
            database_type: meta.database_type.clone(),
            node_count: meta.node_count,
            ip_version: meta.ip_version,
        };
        Self { reader, metadata }
    }
}

impl GeoReader for MaxMindReader {
    fn city(&self, ip: IpAddr) -> Result<CityRecord, GeoError> {
        // maxminddb 0.27: lookup() yields a LookupResult; decode() is None when
        // the address has no record
        let lookup = self.reader.lookup(ip)?;
        let city: Option<geoip2::City<'_>> = lookup.decode()?;
        Ok(city.map(|c| city_record(&c)).unwrap_or_default())
    }

    fn metadata(&self) -> &DatabaseMetadata {
        &self.metadata
    }
}

fn city_record(city: &geoip2::City<'_>) -> CityRecord {
    CityRecord {
        continent: Place {
            geoname_id: city.continent.geoname_id.unwrap_or(0),
            code: city.continent.code.unwrap_or_default().to_string(),
            names: names_map(&city.continent.names),
        },
        country: Place {
            geoname_id: city.country.geoname_id.unwrap_or(0),
            code: city.country.iso_code.unwrap_or_default().to_string(),
            names: names_map(&city.country.names),
        },
        city: Place {
            geoname_id: city.city.geoname_id.unwrap_or(0),
            code: String::new(),
            names: names_map(&city.city.names),
        },
    }
}

/// Flattens MaxMind's per-language name fields into a tag-keyed map.
fn names_map(names: &geoip2::Names<'_>) -> BTreeMap<String, String> {
    [
        ("de", names.german),
        ("en", names.english),
        ("es", names.spanish),
        ("fr", names.french),
        ("ja", names.japanese),
        ("pt-BR", names.brazilian_portuguese),
        ("ru", names.russian),
        ("zh-CN", names.simplified_chinese),
    ]
    .into_iter()
    .filter_map(|(tag, name)| name.map(|n| (tag.to_string(), n.to_string())))
    .collect()
}
