//! API routes.

use std::sync::Arc;

use axum::http::StatusCode;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

use crate::handlers::{
    analyze_text, api_status, create_node, delete_node, fusionx_status, fusionx_video,
    generate_character, generate_video, health, ingest_sequence, list_nodes, nlp_capabilities,
    query_learning, ready, record_learning_event, render_scene, stitch_status, stitch_video,
    style_transfer, style_transfer_status, update_node, video_status,
};
use crate::metrics::metrics_middleware;
use crate::middleware::{
    cors_layer, rate_limit_middleware, request_id, request_logging, security_headers,
    RateLimiterCache,
};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let storyboard_routes = Router::new()
        .route(
            "/storyboard",
            get(list_nodes)
                .post(create_node)
                .put(update_node)
                .delete(delete_node),
        )
        .route("/storyboard/ingest", post(ingest_sequence))
        // Rendering is a stitch job over a scene snapshot
        .route("/storyboard/render", post(render_scene).get(stitch_status));

    let learning_routes = Router::new().route(
        "/learning",
        post(record_learning_event).get(query_learning),
    );

    let generation_routes = Router::new()
        .route("/characters/generate", post(generate_character))
        .route("/nlp/analyze", post(analyze_text).get(nlp_capabilities))
        .route("/video/generate", post(generate_video).get(video_status))
        .route("/video/stitch", post(stitch_video).get(stitch_status))
        .route("/video/fusionx", post(fusionx_video).get(fusionx_status))
        .route("/style-transfer", post(style_transfer).get(style_transfer_status));

    let rate_limiter = Arc::new(RateLimiterCache::new(
        state.config.rate_limit_rps,
        state.config.rate_limit_burst,
    ));

    let api_routes = Router::new()
        .merge(storyboard_routes)
        .merge(learning_routes)
        .merge(generation_routes)
        .route("/status", get(api_status))
        .layer(middleware::from_fn_with_state(
            rate_limiter,
            rate_limit_middleware,
        ));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready));

    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            state.config.request_timeout,
        ))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
