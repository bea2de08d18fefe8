//! HTTP API handlers

mod bridge;
mod health;
mod modules;
mod origin;
mod webui;

use axum::{routing::get, Router};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::AppState;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    let config = state.config.clone();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin, parts| {
            origin::origin_allowed(origin, parts, &config)
        }))
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Module routes
        .route("/modules", get(modules::list_modules));

    Router::new()
        .nest("/api/v1", api_routes)
        // Module web UI routes
        .route("/webui/{id}", get(webui::redirect_to_index))
        .route("/webui/{id}/", get(webui::serve_index))
        .route("/webui/{id}/bridge", get(bridge::bridge_websocket))
        .route("/webui/{id}/{*path}", get(webui::serve_asset))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
