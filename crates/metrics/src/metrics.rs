use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, register_int_gauge,
    HistogramVec, IntCounter, IntCounterVec, IntGauge,
};

lazy_static! {
    // ═══════════════════════════════════════════════════════════════════════════
    // JOB METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Jobs created, by workflow type
    pub static ref JOBS_CREATED: IntCounterVec = register_int_counter_vec!(
        "fluxfolio_jobs_created_total",
        "Total number of background jobs created",
        &["job_type"]
    )
    .unwrap();

    /// Jobs that reached a terminal state, by workflow type and outcome
    pub static ref JOBS_FINISHED: IntCounterVec = register_int_counter_vec!(
        "fluxfolio_jobs_finished_total",
        "Total number of background jobs finished",
        &["job_type", "outcome"]
    )
    .unwrap();

    /// Jobs currently running
    pub static ref ACTIVE_JOBS: IntGauge = register_int_gauge!(
        "fluxfolio_jobs_active",
        "Current number of running background jobs"
    )
    .unwrap();

    /// Step updates that could not be persisted
    pub static ref JOB_UPDATE_FAILURES: IntCounter = register_int_counter!(
        "fluxfolio_job_update_failures_total",
        "Total number of job step updates that were dropped"
    )
    .unwrap();

    // ═══════════════════════════════════════════════════════════════════════════
    // STAGE METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Workflow stage results by stage name and outcome
    pub static ref STAGE_RESULTS: IntCounterVec = register_int_counter_vec!(
        "fluxfolio_stage_results_total",
        "Total workflow stage results",
        &["stage", "outcome"]
    )
    .unwrap();

    /// Workflow stage duration in milliseconds
    pub static ref STAGE_DURATION: HistogramVec = register_histogram_vec!(
        "fluxfolio_stage_duration_ms",
        "Workflow stage duration in milliseconds",
        &["stage"],
        vec![10.0, 50.0, 100.0, 500.0, 1000.0, 5000.0, 15000.0, 30000.0, 60000.0, 120000.0, 400000.0]
    )
    .unwrap();

    // ═══════════════════════════════════════════════════════════════════════════
    // SIGNATURE METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Signature requests by how the signature was obtained
    pub static ref SIGNATURE_REQUESTS: IntCounterVec = register_int_counter_vec!(
        "fluxfolio_signature_requests_total",
        "Total threshold signature requests",
        &["path", "outcome"]
    )
    .unwrap();

    /// Times the coordinator fell back to polling a broadcast transaction
    pub static ref SIGNATURE_FALLBACKS: IntCounter = register_int_counter!(
        "fluxfolio_signature_fallbacks_total",
        "Total signature requests resolved by transaction polling"
    )
    .unwrap();

    // ═══════════════════════════════════════════════════════════════════════════
    // RELAY METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Relay calls by method and outcome
    pub static ref RELAY_REQUESTS: IntCounterVec = register_int_counter_vec!(
        "fluxfolio_relay_requests_total",
        "Total solver relay and bridge requests",
        &["method", "outcome"]
    )
    .unwrap();

    /// Relay call latency in milliseconds
    pub static ref RELAY_LATENCY: HistogramVec = register_histogram_vec!(
        "fluxfolio_relay_latency_ms",
        "Solver relay and bridge latency in milliseconds",
        &["method"],
        vec![10.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0]
    )
    .unwrap();

    /// Settlement status checks
    pub static ref SETTLEMENT_POLLS: IntCounterVec = register_int_counter_vec!(
        "fluxfolio_settlement_polls_total",
        "Total intent settlement status checks",
        &["status"]
    )
    .unwrap();

    // ═══════════════════════════════════════════════════════════════════════════
    // ERROR METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Error events by type
    pub static ref ERRORS: IntCounterVec = register_int_counter_vec!(
        "fluxfolio_errors_total",
        "Total error events by type",
        &["error_type"]
    )
    .unwrap();
}
