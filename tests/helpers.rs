// Shared test helpers for update sources and fake databases.
//
// This module provides common utilities used across multiple test files to reduce duplication.

use std::collections::BTreeMap;
use std::io::Write;
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;

use flate2::write::GzEncoder;
use flate2::Compression;
use tar::Builder;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use geolocate::geoip::{CityRecord, DatabaseMetadata, DatabaseOpener, GeoReader, Place};
use geolocate::{Config, GeoDb, GeoError};

/// Path the mock update source serves its archive on.
#[allow(dead_code)] // Used by other test files
pub const ARCHIVE_PATH: &str = "/GeoLite2-City.tar.gz";

/// Creates a tar.gz archive with the specified files.
#[allow(dead_code)]
pub fn create_test_tar_gz(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut tar_builder = Builder::new(Vec::new());
    for (name, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_path(name).expect("Failed to set entry path");
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        tar_builder
            .append(&header, *content)
            .expect("Failed to append entry");
    }
    let tar_bytes = tar_builder.into_inner().expect("Failed to finish tar");

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&tar_bytes).expect("Failed to compress");
    encoder.finish().expect("Failed to finish gzip")
}

/// A release archive in MaxMind layout holding `record` as a fake database.
#[allow(dead_code)]
pub fn release_archive(version: &str, record: &CityRecord) -> Vec<u8> {
    let database = serde_json::to_vec(record).expect("Failed to encode record");
    let copyright = format!("{}/COPYRIGHT.txt", version);
    let entry = format!("{}/GeoLite2-City.mmdb", version);
    create_test_tar_gz(&[
        (copyright.as_str(), b"Database and Contents Copyright (c) MaxMind".as_slice()),
        (entry.as_str(), database.as_slice()),
    ])
}

fn names(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Paris, France, Europe with English, German and Chinese names.
#[allow(dead_code)]
pub fn paris() -> CityRecord {
    CityRecord {
        continent: Place {
            geoname_id: 6_255_148,
            code: "EU".to_string(),
            names: names(&[("en", "Europe"), ("de", "Europa"), ("zh-CN", "欧洲")]),
        },
        country: Place {
            geoname_id: 3_017_382,
            code: "FR".to_string(),
            names: names(&[("en", "France"), ("de", "Frankreich"), ("zh-CN", "法国")]),
        },
        city: Place {
            geoname_id: 2_988_507,
            code: String::new(),
            names: names(&[("en", "Paris"), ("de", "Paris"), ("zh-CN", "巴黎")]),
        },
    }
}

/// Berlin, Germany, Europe.
#[allow(dead_code)]
pub fn berlin() -> CityRecord {
    CityRecord {
        continent: paris().continent,
        country: Place {
            geoname_id: 2_921_044,
            code: "DE".to_string(),
            names: names(&[("en", "Germany"), ("de", "Deutschland")]),
        },
        city: Place {
            geoname_id: 2_950_159,
            code: String::new(),
            names: names(&[("en", "Berlin"), ("de", "Berlin")]),
        },
    }
}

/// Fake decoder: a database file is the JSON of one `CityRecord`, answered
/// for every address.
pub struct JsonOpener;

struct JsonReader {
    record: CityRecord,
    metadata: DatabaseMetadata,
}

impl DatabaseOpener for JsonOpener {
    fn open(&self, path: &Path) -> Result<Arc<dyn GeoReader>, GeoError> {
        let bytes = std::fs::read(path).map_err(|e| GeoError::io(format!("{:?}", path), e))?;
        let record: CityRecord =
            serde_json::from_slice(&bytes).map_err(|e| GeoError::Decode(e.to_string()))?;
        let metadata = DatabaseMetadata {
            languages: record.country.names.keys().cloned().collect(),
            binary_format_major_version: 2,
            binary_format_minor_version: 0,
            build_epoch: u64::from(record.city.geoname_id),
            database_type: "GeoLite2-City".to_string(),
            ip_version: 6,
            ..Default::default()
        };
        Ok(Arc::new(JsonReader { record, metadata }))
    }
}

impl GeoReader for JsonReader {
    fn city(&self, _ip: IpAddr) -> Result<CityRecord, GeoError> {
        Ok(self.record.clone())
    }

    fn metadata(&self) -> &DatabaseMetadata {
        &self.metadata
    }
}

/// Starts a mock update source serving `archive` with status 200.
#[allow(dead_code)]
pub async fn serve_archive(archive: Vec<u8>) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ARCHIVE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(archive))
        .mount(&server)
        .await;
    server
}

/// An engine over `dir` using the JSON decoder and `server` as update source.
#[allow(dead_code)]
pub fn test_engine(dir: &Path, server: &MockServer) -> Arc<GeoDb> {
    let config = Config {
        dir: dir.to_path_buf(),
        source_url: Some(format!("{}{}", server.uri(), ARCHIVE_PATH)),
        ..Default::default()
    };
    Arc::new(
        GeoDb::new(&config)
            .expect("Failed to build engine")
            .with_opener(Arc::new(JsonOpener)),
    )
}
