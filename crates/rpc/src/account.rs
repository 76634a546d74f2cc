use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::client::{NearRpcClient, TxStatusProvider};
use crate::outcome::FinalExecutionOutcome;
use crate::signer::InMemorySigner;
use crate::transaction::{Action, FunctionCallAction, Transaction, DEFAULT_GAS};
use crate::RpcError;

/// A contract method invocation
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub contract_id: String,
    pub method_name: String,
    pub args: Value,
    pub gas: u64,
    pub deposit: u128,
}

impl FunctionCall {
    pub fn new(contract_id: impl Into<String>, method_name: impl Into<String>, args: Value) -> Self {
        Self {
            contract_id: contract_id.into(),
            method_name: method_name.into(),
            args,
            gas: DEFAULT_GAS,
            deposit: 0,
        }
    }

    pub fn with_deposit(mut self, deposit: u128) -> Self {
        self.deposit = deposit;
        self
    }

    pub fn with_gas(mut self, gas: u64) -> Self {
        self.gas = gas;
        self
    }
}

/// An account that can sign and submit contract calls
#[async_trait]
pub trait FunctionCaller: Send + Sync {
    fn account_id(&self) -> &str;

    /// Sign, broadcast and wait for the outcome. When the outcome is not
    /// observed after broadcast the error carries the transaction hash.
    async fn function_call(&self, call: FunctionCall) -> Result<FinalExecutionOutcome, RpcError>;

    async fn tx_status(&self, tx_hash: &str) -> Result<FinalExecutionOutcome, RpcError>;
}

/// Signs transactions locally and submits them through a NEAR node
pub struct NearAccount {
    rpc: Arc<NearRpcClient>,
    signer: InMemorySigner,
    commit_timeout: Duration,
    last_nonce: Mutex<u64>,
}

impl NearAccount {
    pub fn new(rpc: Arc<NearRpcClient>, signer: InMemorySigner) -> Self {
        Self {
            rpc,
            signer,
            commit_timeout: Duration::from_secs(60),
            last_nonce: Mutex::new(0),
        }
    }

    /// Bound on waiting for `broadcast_tx_commit`
    pub fn with_commit_timeout(mut self, timeout: Duration) -> Self {
        self.commit_timeout = timeout;
        self
    }

    pub fn signer(&self) -> &InMemorySigner {
        &self.signer
    }

    /// Next nonce and reference block. Concurrent calls from this account get
    /// distinct nonces even before the chain reflects earlier transactions.
    async fn next_nonce(&self) -> Result<(u64, [u8; 32]), RpcError> {
        let mut last = self.last_nonce.lock().await;
        let key = self
            .rpc
            .view_access_key(&self.signer.account_id, &self.signer.public_key_string())
            .await?;

        let block_hash: [u8; 32] = bs58::decode(&key.block_hash)
            .into_vec()
            .map_err(|e| RpcError::Decode(format!("block hash: {e}")))?
            .try_into()
            .map_err(|_| RpcError::Decode("block hash is not 32 bytes".to_string()))?;

        let nonce = key.nonce.max(*last) + 1;
        *last = nonce;
        Ok((nonce, block_hash))
    }
}

#[async_trait]
impl FunctionCaller for NearAccount {
    fn account_id(&self) -> &str {
        &self.signer.account_id
    }

    async fn function_call(&self, call: FunctionCall) -> Result<FinalExecutionOutcome, RpcError> {
        let (nonce, block_hash) = self.next_nonce().await?;
        let args = serde_json::to_vec(&call.args).map_err(|e| RpcError::Decode(e.to_string()))?;

        let tx = Transaction {
            signer_id: self.signer.account_id.clone(),
            public_key: self.signer.public_key(),
            nonce,
            receiver_id: call.contract_id.clone(),
            block_hash,
            actions: vec![Action::FunctionCall(FunctionCallAction {
                method_name: call.method_name.clone(),
                args,
                gas: call.gas,
                deposit: call.deposit,
            })],
        };

        let (signed, tx_hash) = tx
            .sign(self.signer.signing_key())
            .map_err(|e| RpcError::Decode(format!("encode transaction: {e}")))?;
        let bytes = borsh::BorshSerialize::try_to_vec(&signed)
            .map_err(|e| RpcError::Decode(format!("encode transaction: {e}")))?;

        info!(
            signer = %self.signer.account_id,
            contract = %call.contract_id,
            method = %call.method_name,
            tx_hash = %tx_hash,
            "Broadcasting function call"
        );

        match self.rpc.broadcast_tx_commit(&bytes, self.commit_timeout).await {
            Ok(outcome) => Ok(outcome),
            // the node may have accepted it; let the caller follow up by hash
            Err(err @ (RpcError::Timeout(_) | RpcError::Transport(_))) => {
                warn!(tx_hash = %tx_hash, error = %err, "Function call outcome not observed");
                Err(RpcError::Unconfirmed {
                    tx_hash,
                    reason: err.to_string(),
                })
            }
            Err(err) if err.is_timeout() => {
                warn!(tx_hash = %tx_hash, error = %err, "Node timed out waiting for function call");
                Err(RpcError::Unconfirmed {
                    tx_hash,
                    reason: err.to_string(),
                })
            }
            Err(err) => Err(err),
        }
    }

    async fn tx_status(&self, tx_hash: &str) -> Result<FinalExecutionOutcome, RpcError> {
        self.rpc.tx_status(tx_hash, &self.signer.account_id).await
    }
}
