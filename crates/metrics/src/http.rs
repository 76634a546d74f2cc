use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;

use crate::collector::MetricsCollector;

/// Standalone listener exposing `/metrics` for Prometheus scrapes
pub struct MetricsServer {
    collector: Arc<MetricsCollector>,
    addr: String,
}

impl MetricsServer {
    pub fn new(collector: Arc<MetricsCollector>, addr: impl Into<String>) -> Self {
        Self {
            collector,
            addr: addr.into(),
        }
    }

    pub fn router(collector: Arc<MetricsCollector>) -> Router {
        Router::new()
            .route("/metrics", get(scrape))
            .route("/health", get(|| async { "ok" }))
            .with_state(collector)
    }

    /// Bind and serve until the listener fails
    pub async fn serve(self) -> Result<(), MetricsServerError> {
        let listener = TcpListener::bind(&self.addr)
            .await
            .map_err(|e| MetricsServerError::Bind {
                addr: self.addr.clone(),
                reason: e.to_string(),
            })?;
        tracing::info!(addr = %self.addr, "metrics server listening");

        axum::serve(listener, Self::router(self.collector))
            .await
            .map_err(|e| MetricsServerError::Serve(e.to_string()))
    }
}

async fn scrape(State(collector): State<Arc<MetricsCollector>>) -> Response {
    match collector.export_metrics() {
        Ok(text) => ([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], text).into_response(),
        Err(e) => {
            tracing::error!(error = %e, error_type = "metrics_export", "metrics export failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MetricsServerError {
    #[error("failed to bind metrics listener on {addr}: {reason}")]
    Bind { addr: String, reason: String },

    #[error("metrics server error: {0}")]
    Serve(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    async fn get_text(router: Router, uri: &str) -> (StatusCode, String) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_scrape_includes_recorded_series() {
        let collector = Arc::new(MetricsCollector::new());
        collector.record_signature_fallback();

        let (status, text) = get_text(MetricsServer::router(collector), "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(text.contains("fluxfolio_signature_fallbacks_total"));
    }

    #[tokio::test]
    async fn test_health_route() {
        let (status, text) =
            get_text(MetricsServer::router(Arc::new(MetricsCollector::new())), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(text, "ok");
    }

    #[tokio::test]
    async fn test_bind_failure_is_reported() {
        let server = MetricsServer::new(Arc::new(MetricsCollector::new()), "not-an-address");
        assert!(matches!(
            server.serve().await,
            Err(MetricsServerError::Bind { .. })
        ));
    }
}
