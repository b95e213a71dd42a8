//! Router setup with all API routes and middleware.
//!
//! Configures the axum Router with CORS, tracing, compression,
//! and all endpoint handlers.

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Snapshots carry every embedding, so imports get a larger body limit.
const SNAPSHOT_BODY_LIMIT: usize = 256 * 1024 * 1024;

/// Create the axum Router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // CORS: localhost origins on the configured port only.
    let port = state.config.general.port;
    let origins: Vec<HeaderValue> = [
        format!("http://127.0.0.1:{}", port),
        format!("http://localhost:{}", port),
    ]
    .iter()
    .filter_map(|origin| origin.parse().ok())
    .collect();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/nodes", post(handlers::create_node))
        .route(
            "/nodes/{id}",
            get(handlers::get_node)
                .put(handlers::update_node)
                .delete(handlers::delete_node),
        )
        .route("/edges", post(handlers::create_edge))
        .route(
            "/edges/{id}",
            get(handlers::get_edge)
                .put(handlers::update_edge)
                .delete(handlers::delete_edge),
        )
        .route(
            "/search/vector",
            get(handlers::search_vector_get).post(handlers::search_vector_post),
        )
        .route("/search/graph", get(handlers::search_graph))
        .route(
            "/search/hybrid",
            get(handlers::search_hybrid_get).post(handlers::search_hybrid_post),
        )
        .route(
            "/snapshot",
            get(handlers::export_snapshot)
                .put(handlers::import_snapshot)
                .layer(DefaultBodyLimit::max(SNAPSHOT_BODY_LIMIT)),
        )
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
