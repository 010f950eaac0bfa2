//! Prometheus metrics for the cache and the HTTP surface.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use tracing::{debug, error};

use roster_cache::MetricsSink;

use crate::state::AppState;

/// HTTP request latency buckets (seconds)
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.0005, 0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5,
];

/// Metrics for one server instance.
///
/// Each instance owns its registry, so several servers (or tests) can live
/// in one process without colliding on metric names.
#[derive(Clone)]
pub struct ApiMetrics {
    registry: Registry,
    cache_hits: IntCounter,
    cache_misses: IntCounter,
    cache_size: IntGauge,
    http_requests_total: IntCounterVec,
    http_request_duration_seconds: HistogramVec,
}

impl ApiMetrics {
    /// Creates and registers every metric.
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let cache_hits = IntCounter::new("cache_hits_total", "Reads answered from the cache")?;
        let cache_misses = IntCounter::new(
            "cache_misses_total",
            "Reads that went to the backing store",
        )?;
        let cache_size = IntGauge::new("cache_size", "Entries currently held in the cache")?;
        let http_requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests"),
            &["method", "endpoint", "status"],
        )?;
        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(HTTP_LATENCY_BUCKETS.to_vec()),
            &["method", "endpoint"],
        )?;

        registry.register(Box::new(cache_hits.clone()))?;
        registry.register(Box::new(cache_misses.clone()))?;
        registry.register(Box::new(cache_size.clone()))?;
        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;

        Ok(Self {
            registry,
            cache_hits,
            cache_misses,
            cache_size,
            http_requests_total,
            http_request_duration_seconds,
        })
    }

    /// Records one finished HTTP request.
    pub fn record_http_request(&self, method: &str, endpoint: &str, status: u16, duration_secs: f64) {
        let status = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, endpoint, &status])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, endpoint])
            .observe(duration_secs);
    }

    /// Cache hits so far.
    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.get()
    }

    /// Cache misses so far.
    pub fn cache_misses(&self) -> u64 {
        self.cache_misses.get()
    }

    /// Last reported cache size.
    pub fn cache_size(&self) -> i64 {
        self.cache_size.get()
    }

    /// Renders every metric in the Prometheus text format.
    pub fn render(&self) -> prometheus::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl MetricsSink for ApiMetrics {
    fn on_hit(&self) {
        self.cache_hits.inc();
    }

    fn on_miss(&self) {
        self.cache_misses.inc();
    }

    fn on_size_changed(&self, entries: usize) {
        self.cache_size.set(i64::try_from(entries).unwrap_or(i64::MAX));
    }
}

/// Records count and latency of every routed request.
///
/// Labels use the route template (`/user/:id`) rather than the raw path.
pub async fn track_requests(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status().as_u16();
    state
        .metrics
        .record_http_request(method.as_str(), &endpoint, status, duration.as_secs_f64());

    debug!(
        method = %method,
        endpoint = %endpoint,
        status,
        duration_ms = duration.as_millis() as u64,
        "Request completed"
    );

    response
}

/// GET /metrics
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.metrics.render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to encode metrics").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_updates_gauges() {
        let metrics = ApiMetrics::new().unwrap();
        metrics.on_hit();
        metrics.on_hit();
        metrics.on_miss();
        metrics.on_size_changed(7);

        assert_eq!(metrics.cache_hits(), 2);
        assert_eq!(metrics.cache_misses(), 1);
        assert_eq!(metrics.cache_size(), 7);
    }

    #[test]
    fn test_render_contains_series() {
        let metrics = ApiMetrics::new().unwrap();
        metrics.on_miss();
        metrics.record_http_request("GET", "/user/:id", 200, 0.002);

        let text = metrics.render().unwrap();
        assert!(text.contains("cache_misses_total 1"));
        assert!(text.contains("http_requests_total{"));
        assert!(text.contains("endpoint=\"/user/:id\""));
        assert!(text.contains("http_request_duration_seconds_bucket"));
    }

    #[test]
    fn test_instances_are_independent() {
        let a = ApiMetrics::new().unwrap();
        let b = ApiMetrics::new().unwrap();
        a.on_hit();
        assert_eq!(a.cache_hits(), 1);
        assert_eq!(b.cache_hits(), 0);
    }
}
