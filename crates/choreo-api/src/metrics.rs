//! Prometheus metrics for the API server.

use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "choreo_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "choreo_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "choreo_http_requests_in_flight";

    // Studio metrics
    pub const INGESTED_NODES_TOTAL: &str = "choreo_ingested_nodes_total";
    pub const INGESTION_FAILURES_TOTAL: &str = "choreo_ingestion_failures_total";
    pub const SETUP_REQUIRED_TOTAL: &str = "choreo_setup_required_total";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "choreo_rate_limit_hits_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", path.to_string()),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record the outcome of an ingestion batch.
pub fn record_ingestion(source: &'static str, created: usize, failed: usize) {
    counter!(names::INGESTED_NODES_TOTAL, "source" => source).increment(created as u64);
    if failed > 0 {
        counter!(names::INGESTION_FAILURES_TOTAL, "source" => source).increment(failed as u64);
    }
}

/// Record a request rejected because a vendor is not configured.
pub fn record_setup_required(service: &'static str) {
    counter!(names::SETUP_REQUIRED_TOTAL, "service" => service).increment(1);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", endpoint.to_string())];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

/// Metrics middleware for HTTP requests.
///
/// Requests are labelled by their matched route so query strings and unknown
/// paths don't explode label cardinality.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}
