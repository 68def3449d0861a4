//! HTTP API state and request negotiation.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::header::{ACCEPT, ACCEPT_LANGUAGE};
use axum::http::HeaderMap;

use crate::geoip::GeoDb;

/// Shared state for the HTTP API
#[derive(Clone)]
pub struct ApiState {
    pub db: Arc<GeoDb>,
}

/// Response body format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    /// Indented JSON, asked for with the `pretty` query flag
    PrettyJson,
    /// The plain summary line
    Text,
}

impl OutputFormat {
    fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "text" | "txt" => Some(OutputFormat::Text),
            _ => None,
        }
    }

    /// Picks the format: `format`/`fmt`/`output` query parameter, then the path
    /// suffix, then the `Accept` header, defaulting to JSON. JSON turns into
    /// [`OutputFormat::PrettyJson`] when the `pretty` flag is present.
    pub fn negotiate(
        query: &HashMap<String, String>,
        suffix: Option<OutputFormat>,
        headers: &HeaderMap,
    ) -> Self {
        let format = first_param(query, &["format", "fmt", "output"])
            .and_then(Self::from_name)
            .or(suffix)
            .unwrap_or_else(|| {
                let accept = header_str(headers, ACCEPT.as_str()).unwrap_or_default();
                if accept.contains("text/plain") && !accept.contains("application/json") {
                    OutputFormat::Text
                } else {
                    OutputFormat::Json
                }
            });

        if format == OutputFormat::Json && wants_pretty(query) {
            OutputFormat::PrettyJson
        } else {
            format
        }
    }
}

/// `?pretty` with no value, or any value other than `false`/`0`.
fn wants_pretty(query: &HashMap<String, String>) -> bool {
    query
        .get("pretty")
        .is_some_and(|value| !matches!(value.trim().to_ascii_lowercase().as_str(), "false" | "0"))
}

/// Splits a `.json`/`.txt`/`.text` suffix off the last path segment.
pub fn split_format_suffix(segment: &str) -> (&str, Option<OutputFormat>) {
    segment
        .rsplit_once('.')
        .and_then(|(base, ext)| OutputFormat::from_name(ext).map(|f| (base, Some(f))))
        .unwrap_or((segment, None))
}

/// Requested language: `lang`/`ln`/`l` query parameter, else the first tag of
/// `Accept-Language` without its quality value. Empty if neither is given.
pub fn request_language(query: &HashMap<String, String>, headers: &HeaderMap) -> String {
    if let Some(lang) = first_param(query, &["lang", "ln", "l"]) {
        return lang.to_string();
    }

    header_str(headers, ACCEPT_LANGUAGE.as_str())
        .and_then(|value| value.split(',').next())
        .and_then(|tag| tag.split(';').next())
        .map(|tag| tag.trim().to_string())
        .unwrap_or_default()
}

/// Address of the client: `X-Real-IP`, then the first `X-Forwarded-For`
/// entry, then the peer address of the connection.
pub fn client_ip(headers: &HeaderMap, peer: SocketAddr) -> String {
    if let Some(ip) = header_str(headers, "x-real-ip").map(str::trim).filter(|ip| !ip.is_empty()) {
        return ip.to_string();
    }
    header_str(headers, "x-forwarded-for")
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| peer.ip().to_string())
}

/// First non-empty value among the query parameters `names`, in that order.
pub(crate) fn first_param<'a>(
    query: &'a HashMap<String, String>,
    names: &[&str],
) -> Option<&'a str> {
    names
        .iter()
        .filter_map(|name| query.get(*name))
        .map(|value| value.trim())
        .find(|value| !value.is_empty())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}
