//! Metrics and monitoring for Fluxfolio
//!
//! Prometheus counters for background jobs, workflow stages, threshold
//! signatures and relay traffic, plus tracing setup and the HTTP endpoint
//! that exposes them.
//!
//! # Example
//!
//! ```no_run
//! use fluxfolio_metrics::{MetricsCollector, MetricsServer};
//! use fluxfolio_types::JobType;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let collector = Arc::new(MetricsCollector::new());
//!     collector.record_job_created(JobType::Withdraw);
//!
//!     let server = MetricsServer::new(collector.clone(), "0.0.0.0:9090".to_string());
//!     server.serve().await.unwrap();
//! }
//! ```

pub mod collector;
pub mod http;
pub mod metrics;
pub mod tracing;

pub use collector::{MetricsCollector, MetricsError, SignaturePath, StageOutcome};
pub use http::{MetricsServer, MetricsServerError};
pub use tracing::{
    init_tracing_with_metrics, CorrelationId, JobSpan, MetricsLayer, TracingError,
};
