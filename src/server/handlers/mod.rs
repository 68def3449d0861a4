//! HTTP API handlers.

mod info;
mod lookup;

use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;

use super::types::OutputFormat;

pub use info::{
    languages_handler, not_found_handler, ping_handler, update_handler, version_handler,
};
pub use lookup::{lookup_ip_handler, lookup_self_handler};

/// Renders `body` as compact or indented JSON, or `text` for plain output.
fn respond<T: Serialize>(
    status: StatusCode,
    format: OutputFormat,
    body: &T,
    text: impl FnOnce() -> String,
) -> Response {
    match format {
        OutputFormat::Json => (status, Json(body)).into_response(),
        OutputFormat::PrettyJson => match serde_json::to_string_pretty(body) {
            Ok(json) => (status, [(CONTENT_TYPE, "application/json")], json).into_response(),
            Err(e) => {
                log::error!("Failed to render JSON response: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        },
        OutputFormat::Text => (status, text()).into_response(),
    }
}
