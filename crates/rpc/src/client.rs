use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use fluxfolio_polling::with_timeout;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::jsonrpc::{JsonRpcRequest, JsonRpcResponse};
use crate::outcome::FinalExecutionOutcome;
use crate::RpcError;

/// Read-only contract access
#[async_trait]
pub trait ContractViewer: Send + Sync {
    /// Call a view method and return its JSON-decoded result
    async fn view(&self, contract_id: &str, method: &str, args: Value) -> Result<Value, RpcError>;
}

/// Lookup of a broadcast transaction's final outcome
#[async_trait]
pub trait TxStatusProvider: Send + Sync {
    async fn tx_status(
        &self,
        tx_hash: &str,
        sender_account_id: &str,
    ) -> Result<FinalExecutionOutcome, RpcError>;
}

#[derive(Debug, Clone, Deserialize)]
struct CallFunctionResult {
    #[serde(default)]
    result: Option<Vec<u8>>,

    #[serde(default)]
    error: Option<String>,
}

/// Nonce and reference block for the next transaction signed with a key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessKeyView {
    pub nonce: u64,
    pub block_hash: String,
}

/// JSON-RPC client for a NEAR node
#[derive(Clone)]
pub struct NearRpcClient {
    url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl NearRpcClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
            timeout,
        }
    }

    pub fn mainnet() -> Self {
        Self::new("https://rpc.mainnet.near.org", Duration::from_secs(10))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Post one JSON-RPC request bounded by this client's timeout
    pub async fn call<P, R>(&self, method: &str, params: P) -> Result<R, RpcError>
    where
        P: Serialize + Send,
        R: DeserializeOwned,
    {
        self.call_with_timeout(method, params, self.timeout).await
    }

    async fn call_with_timeout<P, R>(
        &self,
        method: &str,
        params: P,
        limit: Duration,
    ) -> Result<R, RpcError>
    where
        P: Serialize + Send,
        R: DeserializeOwned,
    {
        let request = JsonRpcRequest::new(method, params);
        debug!(url = %self.url, method, "NEAR rpc request");

        let body = with_timeout(limit, self.post_envelope::<P, R>(&request))
            .await
            .map_err(|t| RpcError::Timeout(t.after.as_millis() as u64))??;

        if let Some(err) = body.error {
            return Err(RpcError::Rpc {
                name: err.kind(),
                message: err.detail(),
            });
        }

        body.result
            .ok_or_else(|| RpcError::Decode("response has neither result nor error".to_string()))
    }

    async fn post_envelope<P, R>(
        &self,
        request: &JsonRpcRequest<P>,
    ) -> Result<JsonRpcResponse<R>, RpcError>
    where
        P: Serialize + Send,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        // nodes report rpc errors with non-2xx codes too, so try the envelope first
        match serde_json::from_slice::<JsonRpcResponse<R>>(&bytes) {
            Ok(body) => Ok(body),
            Err(_) if !status.is_success() => {
                warn!(method = %request.method, %status, "NEAR rpc http error");
                Err(RpcError::Transport(format!(
                    "HTTP {}: {}",
                    status,
                    String::from_utf8_lossy(&bytes)
                )))
            }
            Err(e) => Err(RpcError::Decode(e.to_string())),
        }
    }

    /// Typed view call
    pub async fn view_function<T: DeserializeOwned>(
        &self,
        contract_id: &str,
        method: &str,
        args: Value,
    ) -> Result<T, RpcError> {
        let value = self.view(contract_id, method, args).await?;
        serde_json::from_value(value).map_err(|e| RpcError::Decode(format!("{method}: {e}")))
    }

    pub async fn view_access_key(
        &self,
        account_id: &str,
        public_key: &str,
    ) -> Result<AccessKeyView, RpcError> {
        self.call(
            "query",
            json!({
                "request_type": "view_access_key",
                "finality": "final",
                "account_id": account_id,
                "public_key": public_key,
            }),
        )
        .await
    }

    /// Submit a signed transaction and wait for its execution outcome.
    /// `limit` bounds the wait; the node may also give up with `TIMEOUT_ERROR`.
    pub async fn broadcast_tx_commit(
        &self,
        signed_tx: &[u8],
        limit: Duration,
    ) -> Result<FinalExecutionOutcome, RpcError> {
        self.call_with_timeout("broadcast_tx_commit", vec![STANDARD.encode(signed_tx)], limit)
            .await
    }
}

#[async_trait]
impl ContractViewer for NearRpcClient {
    async fn view(&self, contract_id: &str, method: &str, args: Value) -> Result<Value, RpcError> {
        let args_base64 = STANDARD.encode(
            serde_json::to_vec(&args).map_err(|e| RpcError::Decode(e.to_string()))?,
        );

        let result: CallFunctionResult = self
            .call(
                "query",
                json!({
                    "request_type": "call_function",
                    "finality": "final",
                    "account_id": contract_id,
                    "method_name": method,
                    "args_base64": args_base64,
                }),
            )
            .await?;

        if let Some(message) = result.error {
            return Err(RpcError::ViewFailed {
                method: method.to_string(),
                message,
            });
        }

        let bytes = result.result.unwrap_or_default();
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|e| RpcError::Decode(format!("{method}: {e}")))
    }
}

#[async_trait]
impl TxStatusProvider for NearRpcClient {
    async fn tx_status(
        &self,
        tx_hash: &str,
        sender_account_id: &str,
    ) -> Result<FinalExecutionOutcome, RpcError> {
        self.call(
            "tx",
            json!({
                "tx_hash": tx_hash,
                "sender_account_id": sender_account_id,
                "wait_until": "FINAL",
            }),
        )
        .await
    }
}
