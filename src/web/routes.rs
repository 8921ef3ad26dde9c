use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers;
use super::state::AppState;

// BI routes - query gateway and its diagnostics
pub fn bi_routes() -> Router<Arc<AppState>> {
    Router::new()
        .nest(
            "/bi",
            Router::new()
                // Query endpoints
                .route("/query", post(handlers::api::bi_query))

                // Diagnostics
                .route("/health", get(handlers::api::engine_health))
                .route("/stats", get(handlers::api::cache_stats))
                .route("/cache", delete(handlers::api::clear_cache))

                // Plain-text answers for the conversational agent
                .route("/tools/query", post(handlers::api::tool_query))
                .route("/tools/health", get(handlers::api::tool_health))
                .route("/tools/stats", get(handlers::api::tool_stats))
        )
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::api::service_status))
        .merge(bi_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
