//! HTTP surface of Fluxfolio.
//!
//! User routes authenticate the session `token`, hand the workflow to the
//! [`JobRunner`](fluxfolio_orchestrator::JobRunner) and answer with the job id
//! straight away. Progress is read back through `GET /api/jobs/:id`.

pub mod error;
pub mod handlers;
pub mod session;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::{ApiError, ErrorResponse};
pub use handlers::{HealthResponse, QuotesResponse, SubmitResponse};
pub use session::{InMemorySessionStore, SessionError, SessionStore};
pub use state::AppState;

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/user/buy-bundle", post(handlers::buy_bundle))
        .route("/api/user/rebalance", post(handlers::rebalance))
        .route("/api/user/withdraw", post(handlers::withdraw))
        .route("/api/user/create-account", post(handlers::create_account))
        .route("/api/jobs/:id", get(handlers::get_job))
        .route("/api/quote/fetch-quotes", get(handlers::fetch_quotes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
