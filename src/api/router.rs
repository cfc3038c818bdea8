//! Gateway API router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! Routes are nested under `/api/`.

use axum::extract::DefaultBodyLimit;
use axum::http::header::CACHE_CONTROL;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;

/// Build the gateway router.
///
/// Layers are applied from bottom (innermost) to top (outermost):
///   Cache-Control → Request logger → Body limit → Handler
pub fn gateway_router(ctx: ApiContext) -> Router {
    // Multipart bodies carry several images; the axum default (2 MB) is too small.
    let body_limit = ctx.config.max_body_bytes;

    let api = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/diagnosis/predict", post(endpoints::diagnosis::predict))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(ctx)
        .layer(axum::middleware::from_fn(middleware::audit::log_request))
        .layer(SetResponseHeaderLayer::overriding(
            CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ));

    Router::new().nest("/api", api)
}
