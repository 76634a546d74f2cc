use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use fluxfolio_metrics::metrics::{SIGNATURE_FALLBACKS, SIGNATURE_REQUESTS};
use fluxfolio_metrics::MetricsCollector;
use fluxfolio_mpc::ThresholdSigner;
use fluxfolio_polling::PollConfig;
use fluxfolio_rpc::outcome::TransactionView;
use fluxfolio_rpc::{ExecutionStatus, FinalExecutionOutcome, FunctionCall, FunctionCaller, RpcError};
use fluxfolio_types::MpcSignature;
use serde_json::json;

const R: &str = "02a1b2c3d4e5f60718293a4b5c6d7e8f90a1b2c3d4e5f60718293a4b5c6d7e8f90";
const S: &str = "1f2e3d4c5b6a79881f2e3d4c5b6a79881f2e3d4c5b6a79881f2e3d4c5b6a7988";

/// Broadcasts without observing the outcome; the transaction resolves to
/// `settled` when it is looked up
struct Unobserved {
    settled: Option<MpcSignature>,
}

fn outcome(status: ExecutionStatus) -> FinalExecutionOutcome {
    FinalExecutionOutcome {
        status,
        transaction: Some(TransactionView {
            hash: "TxHash222".to_string(),
            signer_id: None,
            receiver_id: None,
        }),
    }
}

#[async_trait]
impl FunctionCaller for Unobserved {
    fn account_id(&self) -> &str {
        "agent.near"
    }

    async fn function_call(&self, _call: FunctionCall) -> Result<FinalExecutionOutcome, RpcError> {
        Err(RpcError::Unconfirmed {
            tx_hash: "TxHash222".to_string(),
            reason: "timed out".to_string(),
        })
    }

    async fn tx_status(&self, _tx_hash: &str) -> Result<FinalExecutionOutcome, RpcError> {
        Ok(match &self.settled {
            Some(signature) => outcome(ExecutionStatus::SuccessValue(
                STANDARD.encode(serde_json::to_vec(signature).unwrap()),
            )),
            None => outcome(ExecutionStatus::Started),
        })
    }
}

fn count(path: &str, outcome: &str) -> u64 {
    SIGNATURE_REQUESTS.with_label_values(&[path, outcome]).get()
}

fn snapshot() -> [u64; 5] {
    [
        count("immediate", "completed"),
        count("immediate", "failed"),
        count("fallback", "completed"),
        count("fallback", "failed"),
        SIGNATURE_FALLBACKS.get(),
    ]
}

fn delta(before: [u64; 5]) -> [u64; 5] {
    let after = snapshot();
    std::array::from_fn(|i| after[i] - before[i])
}

// One test per binary: the prometheus series are process-wide.
#[tokio::test(start_paused = true)]
async fn test_each_request_recorded_once() {
    let signer = ThresholdSigner::new(Arc::new(MetricsCollector::new()))
        .with_poll_config(PollConfig::new(Duration::from_secs(3), 3));

    let before = snapshot();
    let never = Unobserved { settled: None };
    assert!(signer
        .request_signature(&never, "proxy.near", "withdraw_funds", json!({}))
        .await
        .is_err());
    assert_eq!(delta(before), [0, 0, 0, 1, 1]);

    let before = snapshot();
    let resolved = Unobserved {
        settled: Some(MpcSignature::new(R, S, 0)),
    };
    assert!(signer
        .request_signature(&resolved, "proxy.near", "withdraw_funds", json!({}))
        .await
        .is_ok());
    assert_eq!(delta(before), [0, 0, 1, 0, 1]);
}
