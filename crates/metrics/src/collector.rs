use std::time::Duration;

use fluxfolio_types::JobType;
use prometheus::{Encoder, Registry, TextEncoder};

use crate::metrics::*;

/// Metrics collector for Fluxfolio background workflows
pub struct MetricsCollector {
    registry: Registry,
}

impl MetricsCollector {
    /// Create a new metrics collector with default registry
    pub fn new() -> Self {
        let registry = Registry::new();
        Self { registry }
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Registry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // JOB METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Record a job being created and started
    pub fn record_job_created(&self, job_type: JobType) {
        JOBS_CREATED.with_label_values(&[job_type.as_str()]).inc();
        ACTIVE_JOBS.inc();
    }

    /// Record a job reaching a terminal state
    pub fn record_job_finished(&self, job_type: JobType, outcome: StageOutcome) {
        JOBS_FINISHED
            .with_label_values(&[job_type.as_str(), outcome.as_str()])
            .inc();
        ACTIVE_JOBS.dec();
    }

    /// Record a step update the store refused
    pub fn record_job_update_failure(&self) {
        JOB_UPDATE_FAILURES.inc();
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // STAGE METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Record the result and duration of a workflow stage
    pub fn record_stage(&self, stage: &str, outcome: StageOutcome, duration: Duration) {
        STAGE_RESULTS
            .with_label_values(&[stage, outcome.as_str()])
            .inc();
        STAGE_DURATION
            .with_label_values(&[stage])
            .observe(duration.as_millis() as f64);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // SIGNATURE METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Record a finished threshold signature request
    pub fn record_signature(&self, path: SignaturePath, outcome: StageOutcome) {
        SIGNATURE_REQUESTS
            .with_label_values(&[path.as_str(), outcome.as_str()])
            .inc();
    }

    /// Record a switch from the immediate outcome to transaction polling
    pub fn record_signature_fallback(&self) {
        SIGNATURE_FALLBACKS.inc();
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // RELAY METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Record a relay or bridge call
    pub fn record_relay_request(&self, method: &str, success: bool, latency: Duration) {
        let outcome = if success { "ok" } else { "error" };
        RELAY_REQUESTS.with_label_values(&[method, outcome]).inc();
        RELAY_LATENCY
            .with_label_values(&[method])
            .observe(latency.as_millis() as f64);
    }

    /// Record one settlement status check
    pub fn record_settlement_poll(&self, status: &str) {
        SETTLEMENT_POLLS.with_label_values(&[status]).inc();
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ERROR METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn record_error(&self, error_type: &str) {
        ERRORS.with_label_values(&[error_type]).inc();
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // EXPORT
    // ═══════════════════════════════════════════════════════════════════════════

    /// Export metrics in Prometheus text format
    pub fn export_metrics(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let mut metric_families = prometheus::gather();
        metric_families.extend(self.registry.gather());
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| MetricsError::EncodingError(e.to_string()))?;

        String::from_utf8(buffer).map_err(|e| MetricsError::EncodingError(e.to_string()))
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome label for stages, jobs and signatures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    Completed,
    Failed,
}

impl StageOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageOutcome::Completed => "completed",
            StageOutcome::Failed => "failed",
        }
    }
}

/// How a threshold signature was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignaturePath {
    /// Read from the function call outcome
    Immediate,
    /// Recovered by polling the transaction status
    Fallback,
}

impl SignaturePath {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignaturePath::Immediate => "immediate",
            SignaturePath::Fallback => "fallback",
        }
    }
}

/// Metrics error types
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("encoding error: {0}")]
    EncodingError(String),
    #[error("registry error: {0}")]
    RegistryError(String),
}
