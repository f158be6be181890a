//! Prometheus metrics for the gateway.
//!
//! This module provides:
//! - HTTP request metrics (count and latency per endpoint path)
//! - Lookup metrics (cache and provider latency per operation, cache write failures)
//!
//! Nothing here is process-global. A [`Metrics`] value owns its own Prometheus
//! recorder and is handed to every component that records; the `metrics` macros
//! are routed to it with [`metrics::with_local_recorder`].

use std::sync::Arc;
use std::time::Duration;

use metrics::{Unit, counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle, PrometheusRecorder};

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";

    // Lookup metrics
    pub const GEO_CACHE_DURATION_SECONDS: &str = "geo_cache_duration_seconds";
    pub const GEO_PROVIDER_DURATION_SECONDS: &str = "geo_provider_duration_seconds";
    pub const GEO_CACHE_WRITE_FAILURES_TOTAL: &str = "geo_cache_write_failures_total";
}

/// Latency histogram bucket boundaries in seconds.
pub const DEFAULT_LATENCY_BUCKETS: &[f64] = &[0.1, 0.5, 1.0, 2.0, 5.0];

/// Construction options for [`Metrics`].
#[derive(Debug, Clone)]
pub struct MetricsOptions {
    /// Histogram bucket boundaries, shared by every latency histogram.
    pub buckets: Vec<f64>,
    /// Label carrying the request path on HTTP metrics.
    pub endpoint_label: String,
    /// Label carrying the lookup operation on geo metrics.
    pub operation_label: String,
    /// Collapse numeric and UUID path segments to `{id}` on HTTP metrics.
    ///
    /// Off by default: every distinct path gets its own series.
    pub collapse_ids: bool,
}

impl Default for MetricsOptions {
    fn default() -> Self {
        Self {
            buckets: DEFAULT_LATENCY_BUCKETS.to_vec(),
            endpoint_label: "endpoint".to_string(),
            operation_label: "operation".to_string(),
            collapse_ids: false,
        }
    }
}

struct Inner {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
    options: MetricsOptions,
}

/// Request and lookup instrumentation backed by a private Prometheus recorder.
///
/// Cloning is cheap and every clone records into the same registry. Recording
/// never fails and never blocks on I/O.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("options", &self.inner.options)
            .finish_non_exhaustive()
    }
}

impl Metrics {
    /// Build a recorder with the given options.
    ///
    /// # Errors
    ///
    /// Fails if the bucket list is empty.
    pub fn new(options: MetricsOptions) -> Result<Self, BuildError> {
        let recorder = PrometheusBuilder::new()
            .set_buckets(&options.buckets)?
            .build_recorder();
        let handle = recorder.handle();

        let metrics = Self {
            inner: Arc::new(Inner {
                recorder,
                handle,
                options,
            }),
        };
        metrics.describe();
        Ok(metrics)
    }

    fn with_recorder<T>(&self, f: impl FnOnce() -> T) -> T {
        metrics::with_local_recorder(&self.inner.recorder, f)
    }

    fn describe(&self) {
        self.with_recorder(|| {
            describe_counter!(names::HTTP_REQUESTS_TOTAL, "Total number of requests");
            describe_histogram!(
                names::HTTP_REQUEST_DURATION_SECONDS,
                Unit::Seconds,
                "Request duration in seconds"
            );
            describe_histogram!(
                names::GEO_CACHE_DURATION_SECONDS,
                Unit::Seconds,
                "Cache round-trip duration in seconds"
            );
            describe_histogram!(
                names::GEO_PROVIDER_DURATION_SECONDS,
                Unit::Seconds,
                "Geo provider round-trip duration in seconds"
            );
            describe_counter!(
                names::GEO_CACHE_WRITE_FAILURES_TOTAL,
                "Lookup results that could not be written to the cache"
            );
        });
    }

    // =========================================================================
    // HTTP Metrics
    // =========================================================================

    /// Count one request to `path`.
    ///
    /// Called before the request is handled, so requests the client abandons
    /// are counted too.
    pub fn count_http_request(&self, path: &str) {
        let endpoint = self.endpoint(path);
        let label = self.inner.options.endpoint_label.clone();
        self.with_recorder(|| {
            counter!(names::HTTP_REQUESTS_TOTAL, label => endpoint).increment(1);
        });
    }

    /// Record the wall-clock duration of one request to `path`.
    pub fn record_http_duration(&self, path: &str, duration: Duration) {
        let endpoint = self.endpoint(path);
        let label = self.inner.options.endpoint_label.clone();
        self.with_recorder(|| {
            histogram!(names::HTTP_REQUEST_DURATION_SECONDS, label => endpoint)
                .record(duration.as_secs_f64());
        });
    }

    fn endpoint(&self, path: &str) -> String {
        if self.inner.options.collapse_ids {
            collapse_ids(path)
        } else {
            path.to_string()
        }
    }

    // =========================================================================
    // Lookup Metrics
    // =========================================================================

    /// Record one cache round-trip for `operation`, whatever its outcome.
    pub fn record_cache_duration(&self, operation: &str, duration: Duration) {
        self.record_operation_histogram(names::GEO_CACHE_DURATION_SECONDS, operation, duration);
    }

    /// Record one provider round-trip for `operation`.
    pub fn record_provider_duration(&self, operation: &str, duration: Duration) {
        self.record_operation_histogram(names::GEO_PROVIDER_DURATION_SECONDS, operation, duration);
    }

    /// Count a lookup result that was served but could not be cached.
    pub fn record_cache_write_failure(&self, operation: &str) {
        let label = self.inner.options.operation_label.clone();
        let operation = operation.to_string();
        self.with_recorder(|| {
            counter!(names::GEO_CACHE_WRITE_FAILURES_TOTAL, label => operation).increment(1);
        });
    }

    fn record_operation_histogram(&self, name: &'static str, operation: &str, duration: Duration) {
        let label = self.inner.options.operation_label.clone();
        let operation = operation.to_string();
        self.with_recorder(|| {
            histogram!(name, label => operation).record(duration.as_secs_f64());
        });
    }

    /// Render all metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.inner.handle.render()
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Replace numeric and UUID segments with `{id}`.
fn collapse_ids(path: &str) -> String {
    path.split('/')
        .map(|part| if is_likely_id(part) { "{id}" } else { part })
        .collect::<Vec<_>>()
        .join("/")
}

/// Check if a string looks like an ID (UUID or numeric).
fn is_likely_id(s: &str) -> bool {
    if s.is_empty() {
        return false;
    }

    // UUID pattern (with or without dashes)
    if s.len() == 36 && s.chars().filter(|c| *c == '-').count() == 4 {
        return true;
    }
    if s.len() == 32 && s.chars().all(|c| c.is_ascii_hexdigit()) {
        return true;
    }

    s.chars().all(|c| c.is_ascii_digit())
}
