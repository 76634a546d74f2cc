use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Settlement state of a published intent as reported by the relay
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IntentStatus {
    Pending,
    TxBroadcasted,
    Settled { hash: String },
    /// Rejected, expired, or not yet indexed by the relay
    NotFoundOrNotValid,
}

impl IntentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentStatus::Pending => "PENDING",
            IntentStatus::TxBroadcasted => "TX_BROADCASTED",
            IntentStatus::Settled { .. } => "SETTLED",
            IntentStatus::NotFoundOrNotValid => "NOT_FOUND_OR_NOT_VALID",
        }
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, IntentStatus::Settled { .. })
    }
}

impl fmt::Display for IntentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IntentStatusError {
    #[error("unknown intent status: {0}")]
    Unknown(String),

    #[error("settled intent {0} is missing its transaction hash")]
    MissingSettlementHash(String),
}

/// Raw `get_status` result
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentStatusResponse {
    #[serde(default)]
    pub intent_hash: String,

    pub status: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<SettlementData>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementData {
    pub hash: String,
}

impl TryFrom<IntentStatusResponse> for IntentStatus {
    type Error = IntentStatusError;

    fn try_from(resp: IntentStatusResponse) -> Result<Self, Self::Error> {
        match resp.status.as_str() {
            "PENDING" => Ok(IntentStatus::Pending),
            "TX_BROADCASTED" => Ok(IntentStatus::TxBroadcasted),
            "NOT_FOUND_OR_NOT_VALID" => Ok(IntentStatus::NotFoundOrNotValid),
            "SETTLED" => resp
                .data
                .map(|d| IntentStatus::Settled { hash: d.hash })
                .ok_or(IntentStatusError::MissingSettlementHash(resp.intent_hash)),
            other => Err(IntentStatusError::Unknown(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<IntentStatus, IntentStatusError> {
        let resp: IntentStatusResponse = serde_json::from_str(json).unwrap();
        IntentStatus::try_from(resp)
    }

    #[test]
    fn test_settled_carries_hash() {
        let status =
            parse(r#"{"intent_hash":"ih","status":"SETTLED","data":{"hash":"tx1"}}"#).unwrap();
        assert_eq!(status, IntentStatus::Settled { hash: "tx1".to_string() });
        assert!(status.is_settled());
    }

    #[test]
    fn test_settled_without_hash_is_error() {
        assert_eq!(
            parse(r#"{"intent_hash":"ih","status":"SETTLED"}"#),
            Err(IntentStatusError::MissingSettlementHash("ih".to_string()))
        );
    }

    #[test]
    fn test_non_terminal_and_unknown_statuses() {
        assert_eq!(parse(r#"{"status":"PENDING"}"#).unwrap(), IntentStatus::Pending);
        assert_eq!(
            parse(r#"{"status":"TX_BROADCASTED"}"#).unwrap(),
            IntentStatus::TxBroadcasted
        );
        assert_eq!(
            parse(r#"{"status":"NOT_FOUND_OR_NOT_VALID"}"#).unwrap(),
            IntentStatus::NotFoundOrNotValid
        );
        assert!(matches!(
            parse(r#"{"status":"EXPLODED"}"#),
            Err(IntentStatusError::Unknown(_))
        ));
    }
}
