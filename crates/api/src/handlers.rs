//! REST API handlers

use axum::extract::{Path, Query, State};
use axum::Json;
use fluxfolio_intents::WithdrawRequest;
use fluxfolio_orchestrator::{new_account_id, BuyBundleRequest, Workflow};
use fluxfolio_types::{BundleAllocation, Job, Quote, QuoteRequest};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub running_jobs: usize,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        running_jobs: state.runner.running(),
    })
}

/// Returned by every route that starts a workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub success: bool,
    pub job_id: String,
}

#[derive(Debug, Deserialize)]
pub struct BuyBundleBody {
    pub token: String,
    pub quotes: Vec<Quote>,
    pub allocations: Vec<BundleAllocation>,
}

#[derive(Debug, Deserialize)]
pub struct RebalanceBody {
    pub token: String,
    pub quotes: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawBody {
    pub token: String,
    pub asset: String,
    pub amount: String,
    pub to_address: String,
    #[serde(default)]
    pub deadline: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateAccountBody {
    pub token: String,
    pub username: String,
}

pub async fn buy_bundle(
    State(state): State<AppState>,
    Json(body): Json<BuyBundleBody>,
) -> Result<Json<SubmitResponse>, ApiError> {
    if body.quotes.is_empty() {
        return Err(ApiError::BadRequest("no quotes to execute".to_string()));
    }
    let request = BuyBundleRequest {
        quotes: body.quotes,
        allocations: body.allocations,
    };
    submit(&state, &body.token, Workflow::BuyBundle(request)).await
}

pub async fn rebalance(
    State(state): State<AppState>,
    Json(body): Json<RebalanceBody>,
) -> Result<Json<SubmitResponse>, ApiError> {
    if body.quotes.is_empty() {
        return Err(ApiError::BadRequest("no quotes to execute".to_string()));
    }
    submit(&state, &body.token, Workflow::Rebalance { quotes: body.quotes }).await
}

pub async fn withdraw(
    State(state): State<AppState>,
    Json(body): Json<WithdrawBody>,
) -> Result<Json<SubmitResponse>, ApiError> {
    if body.amount.is_empty() || !body.amount.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ApiError::BadRequest(format!(
            "amount must be an integer in base units, got {:?}",
            body.amount
        )));
    }
    if body.to_address.trim().is_empty() {
        return Err(ApiError::BadRequest("missing destination address".to_string()));
    }

    let request = WithdrawRequest {
        asset: body.asset,
        amount: body.amount,
        destination: body.to_address,
        deadline: body.deadline,
    };
    submit(&state, &body.token, Workflow::Withdraw(request)).await
}

pub async fn create_account(
    State(state): State<AppState>,
    Json(body): Json<CreateAccountBody>,
) -> Result<Json<SubmitResponse>, ApiError> {
    // Reject malformed names before a job exists for them
    new_account_id(
        &body.username,
        &state.runner.orchestrator().config().registrar,
        0,
    )?;
    let workflow = Workflow::CreateAccount {
        username: body.username,
    };
    submit(&state, &body.token, workflow).await
}

async fn submit(
    state: &AppState,
    token: &str,
    workflow: Workflow,
) -> Result<Json<SubmitResponse>, ApiError> {
    let session = state.sessions.authenticate(token).await?;
    let job_type = workflow.job_type();
    let job_id = state.runner.submit(&session.user_id, workflow).await?;

    info!(user_id = %session.user_id, job_id = %job_id, job_type = %job_type, "workflow submitted");
    Ok(Json(SubmitResponse {
        success: true,
        job_id,
    }))
}

pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Job>, ApiError> {
    state
        .tracker()
        .get_job(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("job {id}")))
}

#[derive(Debug, Deserialize)]
pub struct FetchQuotesQuery {
    pub token: String,
    /// JSON array of quote requests
    pub items: String,
}

/// One list per requested item, in request order
#[derive(Debug, Serialize, Deserialize)]
pub struct QuotesResponse {
    pub quotes: Vec<Vec<Quote>>,
}

pub async fn fetch_quotes(
    State(state): State<AppState>,
    Query(query): Query<FetchQuotesQuery>,
) -> Result<Json<QuotesResponse>, ApiError> {
    state.sessions.authenticate(&query.token).await?;

    let items: Vec<QuoteRequest> = serde_json::from_str(&query.items)
        .map_err(|e| ApiError::BadRequest(format!("invalid quote items: {e}")))?;

    let relay = state.relay();
    let quotes = try_join_all(items.iter().map(|item| relay.quote(item))).await?;

    Ok(Json(QuotesResponse { quotes }))
}
