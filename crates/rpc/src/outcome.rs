use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::RpcError;

/// Final result of a transaction as reported by `broadcast_tx_commit` or `tx`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalExecutionOutcome {
    pub status: ExecutionStatus,

    #[serde(default)]
    pub transaction: Option<TransactionView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionView {
    pub hash: String,

    #[serde(default)]
    pub signer_id: Option<String>,

    #[serde(default)]
    pub receiver_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    NotStarted,
    Started,
    Failure(Value),
    /// Base64 encoded return value of the last receipt
    SuccessValue(String),
}

impl FinalExecutionOutcome {
    pub fn tx_hash(&self) -> Option<&str> {
        self.transaction.as_ref().map(|t| t.hash.as_str())
    }

    /// Decoded bytes of the success value, if the transaction succeeded
    pub fn success_bytes(&self) -> Option<Result<Vec<u8>, RpcError>> {
        match &self.status {
            ExecutionStatus::SuccessValue(encoded) => Some(
                STANDARD
                    .decode(encoded)
                    .map_err(|e| RpcError::Decode(format!("success value: {e}"))),
            ),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&Value> {
        match &self.status {
            ExecutionStatus::Failure(value) => Some(value),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_value_decodes() {
        let outcome: FinalExecutionOutcome = serde_json::from_value(json!({
            "status": {"SuccessValue": STANDARD.encode(b"{\"ok\":true}")},
            "transaction": {"hash": "9xYz", "signer_id": "agent.near"}
        }))
        .unwrap();

        assert_eq!(outcome.tx_hash(), Some("9xYz"));
        let bytes = outcome.success_bytes().unwrap().unwrap();
        assert_eq!(bytes, b"{\"ok\":true}");
        assert!(outcome.failure().is_none());
    }

    #[test]
    fn test_unit_and_failure_statuses() {
        let started: FinalExecutionOutcome =
            serde_json::from_value(json!({"status": "Started"})).unwrap();
        assert_eq!(started.status, ExecutionStatus::Started);
        assert!(started.success_bytes().is_none());

        let failed: FinalExecutionOutcome = serde_json::from_value(json!({
            "status": {"Failure": {"ActionError": {"index": 0}}}
        }))
        .unwrap();
        assert!(failed.failure().is_some());
    }
}
