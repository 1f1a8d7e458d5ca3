//! Prometheus metrics surface: a process-wide recorder installed once at
//! startup, scraped via the `/metrics` route.

use axum::response::IntoResponse;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

pub async fn metrics_handler(
    axum::extract::State(handle): axum::extract::State<PrometheusHandle>,
) -> impl IntoResponse {
    handle.render()
}

pub fn record_exchange_resolved(outcome: &str) {
    metrics::counter!("boardroom_exchanges_resolved_total", "outcome" => outcome.to_string()).increment(1);
}

pub fn record_hand_raised() {
    metrics::counter!("boardroom_hands_raised_total").increment(1);
}

pub fn record_session_started() {
    metrics::counter!("boardroom_sessions_started_total").increment(1);
}
