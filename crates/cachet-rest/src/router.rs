//! Main application router.

use crate::{
    controllers::{cache_controller, health_controller, item_controller},
    middleware::logging_middleware,
    state::AppState,
};
use axum::{http::HeaderValue, middleware, routing::get, Router};
use cachet_config::ServerConfig;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;

/// Creates the main application router.
pub fn create_router(state: AppState, server_config: &ServerConfig) -> Router {
    let cors = create_cors_layer(server_config);

    let api_router = Router::new()
        .nest("/items", item_controller::router())
        .nest("/cache", cache_controller::router());

    let router = Router::new()
        // Health endpoints
        .merge(health_controller::router())
        // API v1
        .nest("/api/v1", api_router)
        // Root endpoint
        .route("/", get(root))
        .with_state(state)
        // Add middleware layers
        .layer(middleware::from_fn(logging_middleware))
        .layer(TimeoutLayer::new(server_config.request_timeout()))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    info!("Router created with item and cache admin endpoints");
    router
}

/// Creates a CORS layer based on server configuration.
fn create_cors_layer(server_config: &ServerConfig) -> CorsLayer {
    if !server_config.cors_enabled {
        return CorsLayer::new();
    }

    if server_config.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = server_config
        .cors_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Root endpoint handler.
async fn root() -> &'static str {
    "Cachet demo API v1"
}
