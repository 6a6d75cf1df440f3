use axum::extract::State;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;

/// Install the global Prometheus recorder and describe application metrics.
pub fn install_recorder() -> Result<Arc<PrometheusHandle>, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    metrics::describe_counter!("analysis_jobs_total", "Analysis jobs submitted");
    metrics::describe_counter!("analysis_jobs_completed", "Analysis jobs completed");
    metrics::describe_counter!("analysis_jobs_failed", "Analysis jobs that failed");
    metrics::describe_histogram!(
        "analysis_processing_seconds",
        "Time from processing start to terminal state"
    );
    metrics::describe_counter!(
        "inference_attempts_total",
        "Model attempts, labelled by outcome"
    );
    metrics::describe_histogram!(
        "inference_duration_seconds",
        "Duration of a single model attempt"
    );

    Ok(Arc::new(handle))
}

/// GET /metrics — Prometheus text exposition format.
pub async fn prometheus_metrics(State(handle): State<Arc<PrometheusHandle>>) -> String {
    handle.render()
}
