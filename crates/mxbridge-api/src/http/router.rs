//! Axum router configuration with middleware.
//!
//! Middleware: CORS, request tracing.
//!
//! The built web frontend is served from the configured web directory. API
//! routes take priority; unknown paths fall through to its `index.html` for
//! client-side routing. If the directory does not exist, only the API is
//! served.

use std::path::Path;

use axum::routing::{any, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete gateway router with all routes and middleware.
pub fn build_router(state: AppState, web_dir: &Path) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router = Router::new()
        .route("/send_message", post(handlers::message::send_message))
        .route("/join_room", post(handlers::message::join_room))
        .route("/health", get(handlers::health::health_check))
        .route("/_matrix/{*path}", any(handlers::proxy::forward));

    if web_dir.is_dir() {
        let serve_dir = ServeDir::new(web_dir).fallback(ServeFile::new(web_dir.join("index.html")));
        router = router.fallback_service(serve_dir);
        tracing::info!(path = %web_dir.display(), "static file serving enabled");
    } else {
        tracing::warn!(
            path = %web_dir.display(),
            "web directory not found, serving the API only"
        );
    }

    // Layers go on last so they also wrap the static fallback.
    router
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
