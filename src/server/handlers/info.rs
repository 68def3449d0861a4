//! Database info, health and update handlers.

use std::collections::HashMap;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};

use super::respond;
use crate::error_handling::GeoError;
use crate::geoip::GeoResult;
use crate::server::types::{split_format_suffix, ApiState, OutputFormat};

fn format_for(uri: &Uri, query: &HashMap<String, String>, headers: &HeaderMap) -> OutputFormat {
    let last = uri.path().rsplit('/').next().unwrap_or_default();
    let (_, suffix) = split_format_suffix(last);
    OutputFormat::negotiate(query, suffix, headers)
}

fn unavailable(format: OutputFormat, err: GeoError) -> Response {
    let result = GeoResult::error("", "", &err);
    respond(StatusCode::SERVICE_UNAVAILABLE, format, &result, || err.to_string())
}

/// `GET /version`: build version of the open database
pub async fn version_handler(
    State(state): State<ApiState>,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let format = format_for(&uri, &query, &headers);
    match state.db.database_version() {
        Ok(version) => respond(StatusCode::OK, format, &version, || version.clone()),
        Err(e) => unavailable(format, e),
    }
}

/// `GET /languages`: name languages carried by the open database
pub async fn languages_handler(
    State(state): State<ApiState>,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let format = format_for(&uri, &query, &headers);
    match state.db.languages() {
        Ok(languages) => respond(StatusCode::OK, format, &languages, || languages.join(",")),
        Err(e) => unavailable(format, e),
    }
}

/// `GET /favicon.ico`: there is none
pub async fn not_found_handler() -> StatusCode {
    StatusCode::NOT_FOUND
}

pub async fn ping_handler() -> &'static str {
    "pong"
}

/// `POST /update`: schedules an update and answers before it runs
pub async fn update_handler(State(state): State<ApiState>) -> Response {
    // the update task logs its own outcome
    drop(state.db.update());
    (StatusCode::ACCEPTED, "update scheduled").into_response()
}
