//! HTTP lookup API.
//!
//! Endpoints:
//! - `/` and `/{ip}` - lookup of the client or of the given address
//! - `/version`, `/languages` - database info
//! - `/ping` - liveness
//! - `/favicon.ico` - always 404
//! - `POST /update` - schedules a database update
//!
//! Lookup and info endpoints answer JSON or the plain summary line; see
//! [`OutputFormat::negotiate`].

mod handlers;
mod types;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::Request;
use axum::http::header::USER_AGENT;
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;

use crate::geoip::GeoDb;
use handlers::{
    languages_handler, lookup_ip_handler, lookup_self_handler, not_found_handler, ping_handler,
    update_handler, version_handler,
};
pub use types::{ApiState, OutputFormat};

/// Builds the API router over `db`.
pub fn router(db: Arc<GeoDb>) -> Router {
    let mut router = Router::new()
        .route("/", get(lookup_self_handler))
        .route("/{ip}", get(lookup_ip_handler))
        .route("/ping", get(ping_handler))
        .route("/favicon.ico", get(not_found_handler))
        .route("/update", post(update_handler));

    for suffix in ["", ".json", ".txt", ".text"] {
        router = router
            .route(&format!("/version{}", suffix), get(version_handler))
            .route(&format!("/languages{}", suffix), get(languages_handler));
    }

    router
        .layer(middleware::from_fn(reject_crawlers))
        .with_state(ApiState { db })
}

/// Serves the API on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, db: Arc<GeoDb>, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(db).into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP API server error")
}

/// Binds `0.0.0.0:port` and serves the API until Ctrl-C.
pub async fn start_server(port: u16, db: Arc<GeoDb>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("Failed to bind HTTP API to port {}", port))?;

    log::info!("HTTP API listening on http://0.0.0.0:{}/", port);

    serve(listener, db, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::warn!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
        log::info!("Shutting down HTTP API");
    })
    .await
}

/// Answers 404 to search-engine crawlers.
async fn reject_crawlers(request: Request, next: Next) -> Response {
    let agent = request
        .headers()
        .get(USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if agent.contains("spider") || agent.contains("bot") {
        log::debug!("Dropped crawler request from {:?}", agent);
        return StatusCode::NOT_FOUND.into_response();
    }
    next.run(request).await
}
