//! GeoIP data structures.
//!
//! This module defines the lookup result returned to callers and the decoded
//! records exchanged with the database reader.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::locale::localized_name;

/// Classification of a looked-up address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultCode {
    /// Public address resolved through the database
    Internet,
    /// RFC 1918 private address
    Internal,
    /// Loopback, link-local or multicast address
    Local,
    /// The lookup failed; `msg` holds the reason
    Error,
}

impl ResultCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultCode::Internet => "internet",
            ResultCode::Internal => "internal",
            ResultCode::Local => "local",
            ResultCode::Error => "error",
        }
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A geographic entity: a stable code plus its display name in one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Name {
    /// Continent code, ISO country code, or city GeoNames id
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub code: String,
    /// Display name resolved with the language fallback policy
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub name: String,
}

impl Name {
    /// Builds a name, resolving display text for `lang` from `names`.
    pub fn localized(code: impl Into<String>, lang: &str, names: &BTreeMap<String, String>) -> Self {
        Self {
            code: code.into(),
            name: localized_name(lang, names),
        }
    }
}

/// The outcome of one lookup. Built fresh per call and never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoResult {
    /// The queried address as given by the caller
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub ip: String,
    /// The requested language tag
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub lang: String,
    pub code: ResultCode,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub msg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub continent: Option<Name>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub country: Option<Name>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub city: Option<Name>,
}

impl GeoResult {
    pub(crate) fn new(ip: &str, lang: &str, code: ResultCode) -> Self {
        Self {
            ip: ip.to_string(),
            lang: lang.to_string(),
            code,
            msg: None,
            continent: None,
            country: None,
            city: None,
        }
    }

    /// Builds the user-facing form of a failed lookup.
    pub fn error(ip: &str, lang: &str, msg: impl fmt::Display) -> Self {
        Self {
            msg: Some(msg.to_string()),
            ..Self::new(ip, lang, ResultCode::Error)
        }
    }

    /// Comma-joined city, country, continent names (each only if present), then the IP.
    pub fn summary(&self) -> String {
        [&self.city, &self.country, &self.continent]
            .into_iter()
            .flatten()
            .map(|n| n.name.as_str())
            .chain(std::iter::once(self.ip.as_str()))
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for GeoResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

/// One geographic level of a decoded record.
///
/// `geoname_id == 0` means the level is absent from the record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Place {
    #[serde(default)]
    pub geoname_id: u32,
    /// Continent code or ISO country code; empty for cities
    #[serde(default)]
    pub code: String,
    /// Display names keyed by language tag (`en`, `zh-CN`, ...)
    #[serde(default)]
    pub names: BTreeMap<String, String>,
}

impl Place {
    pub fn is_present(&self) -> bool {
        self.geoname_id != 0
    }
}

/// A decoded city-level record, independent of the on-disk format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CityRecord {
    #[serde(default)]
    pub continent: Place,
    #[serde(default)]
    pub country: Place,
    #[serde(default)]
    pub city: Place,
}

/// Metadata reported by an open database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseMetadata {
    pub languages: Vec<String>,
    pub description: BTreeMap<String, String>,
    pub binary_format_major_version: u16,
    pub binary_format_minor_version: u16,
    pub build_epoch: u64,
    pub database_type: String,
    pub node_count: u32,
    pub ip_version: u16,
}

impl DatabaseMetadata {
    /// Build version in `v<major>.<minor>.<build_epoch>` form.
    pub fn version_string(&self) -> String {
        format!(
            "v{}.{}.{}",
            self.binary_format_major_version, self.binary_format_minor_version, self.build_epoch
        )
    }
}
