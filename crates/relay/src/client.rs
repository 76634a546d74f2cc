use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use fluxfolio_metrics::MetricsCollector;
use fluxfolio_polling::with_timeout;
use fluxfolio_rpc::{JsonRpcRequest, JsonRpcResponse};
use fluxfolio_types::{
    DepositChain, IntentStatus, IntentStatusResponse, PublishIntentRequest,
    PublishIntentResponse, PublishStatus, Quote, QuoteRequest, SignedData,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::RelayError;

pub const DEFAULT_SOLVER_RELAY_URL: &str = "https://solver-relay-v2.chaindefuser.com/rpc";
pub const DEFAULT_BRIDGE_URL: &str = "https://bridge.chaindefuser.com/rpc";
pub const DEFAULT_RELAY_TIMEOUT: Duration = Duration::from_secs(5);

/// Quote discovery, intent publication and settlement status
#[async_trait]
pub trait SolverRelay: Send + Sync {
    async fn quote(&self, request: &QuoteRequest) -> Result<Vec<Quote>, RelayError>;

    /// Publish a signed intent, returning the relay's intent hash
    async fn publish_intent(
        &self,
        signed_data: &SignedData,
        quote_hashes: &[String],
    ) -> Result<String, RelayError>;

    async fn get_status(&self, intent_hash: &str) -> Result<IntentStatus, RelayError>;
}

/// Per-chain deposit addresses for an intents account
#[async_trait]
pub trait DepositBridge: Send + Sync {
    async fn deposit_address(
        &self,
        account_id: &str,
        chain: DepositChain,
    ) -> Result<String, RelayError>;
}

#[derive(Debug, Deserialize)]
struct DepositAddressResult {
    address: String,
}

#[derive(Debug, Serialize)]
struct DepositAddressArgs<'a> {
    account_id: &'a str,
    chain: DepositChain,
}

/// JSON-RPC client for the solver relay and the deposit bridge
#[derive(Clone)]
pub struct RelayClient {
    client: reqwest::Client,
    solver_relay_url: String,
    bridge_url: String,
    timeout: Duration,
    metrics: Arc<MetricsCollector>,
}

impl RelayClient {
    pub fn new(
        solver_relay_url: impl Into<String>,
        bridge_url: impl Into<String>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            solver_relay_url: solver_relay_url.into(),
            bridge_url: bridge_url.into(),
            timeout: DEFAULT_RELAY_TIMEOUT,
            metrics,
        }
    }

    /// Client for the public defuse endpoints
    pub fn mainnet(metrics: Arc<MetricsCollector>) -> Self {
        Self::new(DEFAULT_SOLVER_RELAY_URL, DEFAULT_BRIDGE_URL, metrics)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send `method` with `args` as the single positional parameter.
    /// A missing or `null` result is returned as `None`.
    pub async fn post<A, R>(&self, url: &str, method: &str, args: A) -> Result<Option<R>, RelayError>
    where
        A: Serialize + Send + Sync,
        R: DeserializeOwned + Send,
    {
        let request = JsonRpcRequest::new(method, [args]);
        let started = Instant::now();
        debug!(url, method, "relay request");

        let result = match with_timeout(self.timeout, self.send::<A, R>(url, &request)).await {
            Ok(result) => result,
            Err(elapsed) => Err(RelayError::RelayTimeout {
                method: method.to_string(),
                after_ms: elapsed.after.as_millis() as u64,
            }),
        };

        self.metrics
            .record_relay_request(method, result.is_ok(), started.elapsed());
        if let Err(err) = &result {
            warn!(url, method, error = %err, "relay request failed");
        }
        result
    }

    async fn send<A, R>(
        &self,
        url: &str,
        request: &JsonRpcRequest<[A; 1]>,
    ) -> Result<Option<R>, RelayError>
    where
        A: Serialize + Send + Sync,
        R: DeserializeOwned + Send,
    {
        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| RelayError::Transport(e.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| RelayError::Transport(e.to_string()))?;

        let body: JsonRpcResponse<R> = match serde_json::from_slice(&bytes) {
            Ok(body) => body,
            Err(_) if !status.is_success() => {
                return Err(RelayError::Transport(format!(
                    "HTTP {}: {}",
                    status,
                    String::from_utf8_lossy(&bytes)
                )))
            }
            Err(e) => return Err(RelayError::Transport(format!("decode response: {e}"))),
        };

        if let Some(err) = body.error {
            return Err(RelayError::Rpc {
                code: err.code,
                message: err.detail(),
            });
        }

        Ok(body.result)
    }
}

#[async_trait]
impl SolverRelay for RelayClient {
    async fn quote(&self, request: &QuoteRequest) -> Result<Vec<Quote>, RelayError> {
        let quotes: Option<Vec<Quote>> = self.post(&self.solver_relay_url, "quote", request).await?;
        let quotes = quotes.unwrap_or_default();
        debug!(
            asset_in = %request.defuse_asset_identifier_in,
            asset_out = %request.defuse_asset_identifier_out,
            count = quotes.len(),
            "received quotes"
        );
        Ok(quotes)
    }

    async fn publish_intent(
        &self,
        signed_data: &SignedData,
        quote_hashes: &[String],
    ) -> Result<String, RelayError> {
        let args = PublishIntentRequest {
            signed_data: signed_data.clone(),
            quote_hashes: quote_hashes.to_vec(),
        };

        let response: PublishIntentResponse = self
            .post(&self.solver_relay_url, "publish_intent", &args)
            .await?
            .ok_or_else(|| RelayError::Rpc {
                code: 0,
                message: "publish_intent returned no result".to_string(),
            })?;

        match response.status {
            PublishStatus::Failed => Err(RelayError::IntentRejected(
                response
                    .reason
                    .unwrap_or_else(|| "no reason given".to_string()),
            )),
            PublishStatus::Ok => {
                let intent_hash = response.intent_hash.ok_or_else(|| RelayError::Rpc {
                    code: 0,
                    message: "publish_intent accepted without an intent hash".to_string(),
                })?;
                info!(intent_hash = %intent_hash, "intent published");
                Ok(intent_hash)
            }
        }
    }

    async fn get_status(&self, intent_hash: &str) -> Result<IntentStatus, RelayError> {
        let response: IntentStatusResponse = self
            .post(
                &self.solver_relay_url,
                "get_status",
                json!({ "intent_hash": intent_hash }),
            )
            .await?
            .ok_or_else(|| RelayError::Rpc {
                code: 0,
                message: "get_status returned no result".to_string(),
            })?;

        IntentStatus::try_from(response).map_err(|e| RelayError::Transport(e.to_string()))
    }
}

#[async_trait]
impl DepositBridge for RelayClient {
    async fn deposit_address(
        &self,
        account_id: &str,
        chain: DepositChain,
    ) -> Result<String, RelayError> {
        let result: DepositAddressResult = self
            .post(
                &self.bridge_url,
                "deposit_address",
                DepositAddressArgs { account_id, chain },
            )
            .await?
            .ok_or_else(|| RelayError::Rpc {
                code: 0,
                message: "deposit_address returned no result".to_string(),
            })?;

        Ok(result.address)
    }
}
