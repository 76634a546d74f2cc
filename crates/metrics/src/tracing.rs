use std::sync::Arc;
use tracing::{field::Visit, Event, Level, Subscriber};
use tracing_subscriber::{
    fmt,
    layer::{Context, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

use crate::collector::MetricsCollector;

/// Initialize tracing with metrics integration
///
/// `RUST_LOG` overrides `level` when set. `json` selects the structured
/// output used in deployments, otherwise a human readable format is used.
pub fn init_tracing_with_metrics(
    level: &str,
    json: bool,
    collector: Arc<MetricsCollector>,
) -> Result<(), TracingError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| TracingError::InitError(e.to_string()))?;

    let json_layer = json.then(|| {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_level(true)
            .json()
    });
    let pretty_layer = (!json).then(|| fmt::layer().with_target(true).pretty());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(pretty_layer)
        .with(MetricsLayer::new(collector))
        .try_init()
        .map_err(|e| TracingError::InitError(e.to_string()))?;

    Ok(())
}

/// Tracing layer that counts error events by their `error_type` field
pub struct MetricsLayer {
    collector: Arc<MetricsCollector>,
}

impl MetricsLayer {
    pub fn new(collector: Arc<MetricsCollector>) -> Self {
        Self { collector }
    }
}

impl<S> Layer<S> for MetricsLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() != Level::ERROR {
            return;
        }

        let mut visitor = ErrorTypeVisitor::default();
        event.record(&mut visitor);
        let error_type = visitor.error_type.as_deref().unwrap_or("unclassified");
        self.collector.record_error(error_type);
    }
}

#[derive(Default)]
struct ErrorTypeVisitor {
    error_type: Option<String>,
}

impl Visit for ErrorTypeVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "error_type" {
            self.error_type = Some(format!("{value:?}"));
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "error_type" {
            self.error_type = Some(value.to_string());
        }
    }
}

/// Correlation ID for tracking a request across components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CorrelationId(uuid::Uuid);

impl CorrelationId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Span context for a background workflow
#[derive(Debug, Clone)]
pub struct JobSpan {
    pub correlation_id: CorrelationId,
    pub job_id: String,
    pub job_type: String,
}

impl JobSpan {
    pub fn new(job_id: impl Into<String>, job_type: impl std::fmt::Display) -> Self {
        Self {
            correlation_id: CorrelationId::new(),
            job_id: job_id.into(),
            job_type: job_type.to_string(),
        }
    }

    /// Tracing span for instrumenting the workflow future
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "job",
            correlation_id = %self.correlation_id,
            job_id = %self.job_id,
            job_type = %self.job_type,
        )
    }

    /// Enter a tracing span for this job
    pub fn enter(&self) -> tracing::span::EnteredSpan {
        self.span().entered()
    }
}

/// Tracing error types
#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    #[error("tracing initialization error: {0}")]
    InitError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correlation_id_generation() {
        let id1 = CorrelationId::new();
        let id2 = CorrelationId::new();

        assert_ne!(id1, id2);
        assert_eq!(id1.as_str().len(), 36);
    }

    #[test]
    fn test_job_span_creation() {
        let span = JobSpan::new("job-1", "withdraw");

        assert_eq!(span.job_id, "job-1");
        assert_eq!(span.job_type, "withdraw");
        let _entered = span.enter();
    }

    #[test]
    fn test_metrics_layer_counts_classified_errors() {
        let collector = Arc::new(MetricsCollector::new());
        let subscriber = tracing_subscriber::registry().with(MetricsLayer::new(collector.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::error!(error_type = "layer_probe", "probe failed");
            tracing::warn!(error_type = "ignored_probe", "not counted");
        });

        let text = collector.export_metrics().unwrap();
        assert!(text.contains("error_type=\"layer_probe\""));
        assert!(!text.contains("ignored_probe"));
    }
}
