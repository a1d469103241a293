//! Metrics collection and exposition.
//!
//! # Metrics
//! - `breaker_calls_total` (counter): calls by breaker and outcome
//! - `breaker_state` (gauge): 0=closed, 1=open, 2=half-open
//! - `breaker_transitions_total` (counter): transitions by breaker and target state
//! - `worker_jobs_total` (counter): job outcomes by worker
//! - `worker_active_jobs` (gauge): in-flight jobs per worker
//! - `worker_queue_depth` (gauge): pending/failed queue lengths
//! - `worker_job_duration_seconds` (histogram): execution latency per attempt
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::resilience::circuit_breaker::CircuitState;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_breaker_call(breaker: &str, outcome: &'static str) {
    counter!("breaker_calls_total", "breaker" => breaker.to_string(), "outcome" => outcome)
        .increment(1);
}

pub fn record_breaker_state(breaker: &str, state: CircuitState) {
    let value = match state {
        CircuitState::Closed => 0.0,
        CircuitState::Open => 1.0,
        CircuitState::HalfOpen => 2.0,
    };
    gauge!("breaker_state", "breaker" => breaker.to_string()).set(value);
    counter!(
        "breaker_transitions_total",
        "breaker" => breaker.to_string(),
        "to" => state.as_str()
    )
    .increment(1);
}

pub fn record_job(worker: &str, outcome: &'static str) {
    counter!("worker_jobs_total", "worker" => worker.to_string(), "outcome" => outcome)
        .increment(1);
}

pub fn record_job_duration(worker: &str, start: Instant) {
    histogram!("worker_job_duration_seconds", "worker" => worker.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_active_jobs(worker: &str, active: usize) {
    gauge!("worker_active_jobs", "worker" => worker.to_string()).set(active as f64);
}

pub fn record_queue_depth(worker: &str, pending: usize, failed: usize) {
    gauge!("worker_queue_depth", "worker" => worker.to_string(), "queue" => "pending")
        .set(pending as f64);
    gauge!("worker_queue_depth", "worker" => worker.to_string(), "queue" => "failed")
        .set(failed as f64);
}
