//! Address classification and lookup.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use super::store::GeoDb;
use super::types::{CityRecord, GeoResult, Name, Place, ResultCode};
use crate::error_handling::GeoError;

/// Classifies addresses that never need the database.
///
/// Returns `Local` for loopback, link-local and IPv4 multicast, `Internal`
/// for the RFC 1918 ranges, and `None` for everything else.
pub fn classify(ip: IpAddr) -> Option<ResultCode> {
    match ip {
        IpAddr::V4(v4) => classify_v4(v4),
        IpAddr::V6(v6) => classify_v6(v6).then_some(ResultCode::Local),
    }
}

fn classify_v4(ip: Ipv4Addr) -> Option<ResultCode> {
    if ip.is_loopback() || ip.is_link_local() || ip.is_multicast() {
        Some(ResultCode::Local)
    } else if ip.is_private() {
        Some(ResultCode::Internal)
    } else {
        None
    }
}

fn classify_v6(ip: Ipv6Addr) -> bool {
    let first = ip.segments()[0];
    // fe80::/10 link-local unicast, ff02::/16 link-local multicast
    ip.is_loopback() || first & 0xffc0 == 0xfe80 || first & 0xff0f == 0xff02
}

impl GeoDb {
    /// Looks up `ip` and localizes its names into `lang`.
    ///
    /// Local and internal addresses are answered without touching the
    /// database, even while no handle is open.
    ///
    /// # Errors
    ///
    /// - [`GeoError::InvalidAddress`] if `ip` does not parse
    /// - [`GeoError::UnsupportedAddressFamily`] for public non-IPv4 addresses
    /// - [`GeoError::DatabaseUnavailable`] if no handle is open
    /// - [`GeoError::Decode`] verbatim from the reader
    pub fn find(&self, ip: &str, lang: &str) -> Result<GeoResult, GeoError> {
        let addr: IpAddr = ip
            .parse()
            .map_err(|_| GeoError::InvalidAddress(ip.to_string()))?;
        // ::ffff:a.b.c.d is looked up as a.b.c.d
        let addr = addr.to_canonical();

        if let Some(code) = classify(addr) {
            return Ok(GeoResult::new(ip, lang, code));
        }
        if !addr.is_ipv4() {
            return Err(GeoError::UnsupportedAddressFamily(addr));
        }

        let reader = self.snapshot().ok_or(GeoError::DatabaseUnavailable)?;
        let record = reader.city(addr)?;
        Ok(localize(ip, lang, &record))
    }
}

fn localize(ip: &str, lang: &str, record: &CityRecord) -> GeoResult {
    let name = |place: &Place, code: String| {
        place
            .is_present()
            .then(|| Name::localized(code, lang, &place.names))
    };

    GeoResult {
        continent: name(&record.continent, record.continent.code.clone()),
        country: name(&record.country, record.country.code.clone()),
        city: name(&record.city, record.city.geoname_id.to_string()),
        ..GeoResult::new(ip, lang, ResultCode::Internet)
    }
}
