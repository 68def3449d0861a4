//! Address lookup handlers.

use std::collections::HashMap;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;

use super::respond;
use crate::geoip::{GeoResult, ResultCode};
use crate::server::types::{
    client_ip, first_param, request_language, split_format_suffix, ApiState, OutputFormat,
};

/// `GET /`: looks up the `ip` query parameter, else the requesting client
pub async fn lookup_self_handler(
    State(state): State<ApiState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    lookup(&state, None, peer, &query, &headers)
}

/// `GET /{ip}`: looks up the address in the path, optionally suffixed with a format.
/// An `ip` query parameter takes precedence.
pub async fn lookup_ip_handler(
    State(state): State<ApiState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Path(segment): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    lookup(&state, Some(&segment), peer, &query, &headers)
}

fn lookup(
    state: &ApiState,
    segment: Option<&str>,
    peer: SocketAddr,
    query: &HashMap<String, String>,
    headers: &HeaderMap,
) -> Response {
    let (path_ip, suffix) = segment.map(split_format_suffix).unwrap_or(("", None));
    let ip = match first_param(query, &["ip"]) {
        Some(ip) => ip.to_string(),
        None if !path_ip.is_empty() => path_ip.to_string(),
        None => client_ip(headers, peer),
    };
    let lang = request_language(query, headers);
    let format = OutputFormat::negotiate(query, suffix, headers);

    let result = state.db.find(&ip, &lang).unwrap_or_else(|e| {
        log::debug!("Lookup of {:?} failed: {}", ip, e);
        GeoResult::error(&ip, &lang, e)
    });

    respond(StatusCode::OK, format, &result, || result_text(&result))
}

fn result_text(result: &GeoResult) -> String {
    match (&result.code, &result.msg) {
        (ResultCode::Error, Some(msg)) => format!("error: {}", msg),
        _ => result.summary(),
    }
}
