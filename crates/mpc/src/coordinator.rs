use std::sync::Arc;
use std::time::Duration;

use fluxfolio_metrics::{MetricsCollector, SignaturePath, StageOutcome};
use fluxfolio_polling::{poll_until, PollConfig, PollError, PollOutcome};
use fluxfolio_rpc::{
    ExecutionStatus, FinalExecutionOutcome, FunctionCall, FunctionCaller, DEFAULT_GAS,
};
use fluxfolio_types::{DefuseIntents, MpcSignature, SignedData};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::hash::{erc191_hash, to_hex_prefixed};
use crate::normalize::to_secp256k1;
use crate::SignatureError;

pub const DEFAULT_SIGNATURE_POLL_INTERVAL: Duration = Duration::from_secs(3);
pub const DEFAULT_SIGNATURE_TIMEOUT: Duration = Duration::from_secs(400);

/// Contract method that asks the MPC signer to co-sign an intent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SigningMethod {
    /// Swap or rebalance on behalf of a registered portfolio
    BalancePortfolio { user_portfolio: String },
    WithdrawFunds,
}

impl SigningMethod {
    pub fn method_name(&self) -> &'static str {
        match self {
            SigningMethod::BalancePortfolio { .. } => "balance_portfolio",
            SigningMethod::WithdrawFunds => "withdraw_funds",
        }
    }

    /// Call arguments for `intents` whose published form is `payload`
    pub fn args(&self, intents: &DefuseIntents, payload: &str) -> Value {
        match self {
            SigningMethod::BalancePortfolio { user_portfolio } => json!({
                "user_portfolio": user_portfolio,
                "hash": to_hex_prefixed(&erc191_hash(payload)),
                "defuse_intents": intents,
            }),
            SigningMethod::WithdrawFunds => json!({ "defuse_intent": intents }),
        }
    }
}

/// Requests signatures from the threshold signer contract.
///
/// The signing key never leaves the MPC network. A request is a function
/// call whose return value is the signature. When the call is broadcast but
/// its outcome is not observed, the transaction is polled until it resolves.
pub struct ThresholdSigner {
    poll: PollConfig,
    gas: u64,
    deposit: u128,
    metrics: Arc<MetricsCollector>,
}

impl ThresholdSigner {
    pub fn new(metrics: Arc<MetricsCollector>) -> Self {
        Self {
            poll: PollConfig::from_timeout(DEFAULT_SIGNATURE_TIMEOUT, DEFAULT_SIGNATURE_POLL_INTERVAL),
            gas: DEFAULT_GAS,
            deposit: 0,
            metrics,
        }
    }

    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_gas(mut self, gas: u64) -> Self {
        self.gas = gas;
        self
    }

    pub fn with_deposit(mut self, deposit: u128) -> Self {
        self.deposit = deposit;
        self
    }

    pub fn poll_config(&self) -> &PollConfig {
        &self.poll
    }

    /// Call `method` on `contract_id` and extract the signature it returns
    pub async fn request_signature(
        &self,
        signer: &dyn FunctionCaller,
        contract_id: &str,
        method: &str,
        args: Value,
    ) -> Result<MpcSignature, SignatureError> {
        let call = FunctionCall::new(contract_id, method, args)
            .with_gas(self.gas)
            .with_deposit(self.deposit);

        let (path, result) = match signer.function_call(call).await {
            Ok(outcome) => match signature_from_outcome(&outcome) {
                Ok(Some(signature)) => (SignaturePath::Immediate, Ok(signature)),
                Ok(None) => match outcome.tx_hash() {
                    Some(tx_hash) => (
                        SignaturePath::Fallback,
                        self.await_signature(signer, tx_hash).await,
                    ),
                    None => (
                        SignaturePath::Immediate,
                        Err(SignatureError::SignatureRequestFailed(
                            "outcome is pending and carries no transaction hash".to_string(),
                        )),
                    ),
                },
                Err(err) => (SignaturePath::Immediate, Err(err)),
            },
            Err(err) => match err.tx_hash() {
                Some(tx_hash) => {
                    warn!(
                        tx_hash = %tx_hash,
                        error = %err,
                        "Signature outcome not observed, polling transaction"
                    );
                    (
                        SignaturePath::Fallback,
                        self.await_signature(signer, tx_hash).await,
                    )
                }
                None => (SignaturePath::Immediate, Err(SignatureError::Rpc(err))),
            },
        };

        let outcome = match result {
            Ok(_) => StageOutcome::Completed,
            Err(_) => StageOutcome::Failed,
        };
        self.metrics.record_signature(path, outcome);
        result
    }

    /// Request a signature over the ERC-191 hash of `intents` and wrap it
    /// together with the exact payload that was hashed
    pub async fn sign_intent(
        &self,
        signer: &dyn FunctionCaller,
        contract_id: &str,
        method: &SigningMethod,
        intents: &DefuseIntents,
    ) -> Result<SignedData, SignatureError> {
        let payload = intents
            .payload()
            .map_err(|e| SignatureError::Serialization(e.to_string()))?;
        let args = method.args(intents, &payload);

        info!(
            signer = %signer.account_id(),
            method = method.method_name(),
            nonce = %intents.nonce,
            "Requesting threshold signature"
        );

        let signature = self
            .request_signature(signer, contract_id, method.method_name(), args)
            .await?;
        let encoded = to_secp256k1(&signature)?;
        Ok(SignedData::erc191(payload, encoded))
    }

    async fn await_signature(
        &self,
        signer: &dyn FunctionCaller,
        tx_hash: &str,
    ) -> Result<MpcSignature, SignatureError> {
        self.metrics.record_signature_fallback();

        let result = poll_until(&self.poll, move |attempt| async move {
            match signer.tx_status(tx_hash).await {
                Ok(outcome) => match signature_from_outcome(&outcome) {
                    Ok(Some(signature)) => Ok(PollOutcome::Ready(signature)),
                    Ok(None) => Ok(PollOutcome::Pending),
                    Err(err) => Err::<_, SignatureError>(err),
                },
                Err(err) => {
                    debug!(tx_hash = %tx_hash, attempt, error = %err, "Transaction status unavailable");
                    Ok(PollOutcome::Pending)
                }
            }
        })
        .await;

        result.map_err(|err| match err {
            PollError::Exhausted { attempts } => {
                warn!(tx_hash = %tx_hash, attempts, "Signature transaction never resolved");
                SignatureError::SignatureTimeout {
                    tx_hash: tx_hash.to_string(),
                    attempts,
                }
            }
            PollError::Aborted(err) => err,
        })
    }
}

/// Signature carried by a final outcome, `None` while it is still executing
pub fn signature_from_outcome(
    outcome: &FinalExecutionOutcome,
) -> Result<Option<MpcSignature>, SignatureError> {
    match &outcome.status {
        ExecutionStatus::SuccessValue(_) => {
            let bytes = outcome
                .success_bytes()
                .transpose()
                .map_err(|e| SignatureError::MalformedSignature(e.to_string()))?
                .unwrap_or_default();
            serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| SignatureError::MalformedSignature(e.to_string()))
        }
        ExecutionStatus::Failure(failure) => {
            Err(SignatureError::SignatureRequestFailed(failure.to_string()))
        }
        ExecutionStatus::NotStarted | ExecutionStatus::Started => Ok(None),
    }
}
