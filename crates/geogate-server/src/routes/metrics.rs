use axum::{extract::State, http::header, response::IntoResponse};

use crate::metrics::Metrics;

/// `GET /metrics`: Prometheus text exposition of the gateway's recorder.
pub async fn metrics_handler(State(metrics): State<Metrics>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        metrics.render(),
    )
}
