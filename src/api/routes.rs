use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::request_id::{make_span_with_request_id, request_id_middleware};

use super::handlers;
use super::AppState;

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api", api_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
}

/// Routes under /api
fn api_routes() -> Router<AppState> {
    Router::new()
        // Music artwork
        .route("/music/track-details", post(handlers::track_details))
        // Per-domain catalog and recommendations
        .route("/:domain/search", get(handlers::search))
        .route("/:domain/discover", get(handlers::discover))
        .route("/:domain/genres", get(handlers::genres))
        .route("/:domain/recommend", post(handlers::recommend))
}
