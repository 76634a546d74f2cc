use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Contract that verifies and executes published intents
pub const DEFAULT_VERIFYING_CONTRACT: &str = "intents.near";

/// Memo prefix carrying the off-chain destination of a withdrawal
pub const WITHDRAW_MEMO_PREFIX: &str = "WITHDRAW_TO:";

/// Signing standard used for MPC-signed payloads
pub const ERC191_STANDARD: &str = "erc191";

/// The message a signer commits to.
///
/// Field order is part of the wire format: the proxy contract re-serializes
/// this structure and compares hashes, so it must not be reordered.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefuseIntents {
    pub signer_id: String,
    pub deadline: String,
    pub nonce: String,
    pub verifying_contract: String,
    pub intents: Vec<IntentOperation>,
}

impl DefuseIntents {
    /// Exact JSON text that is hashed, signed and published
    pub fn payload(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn token_diff(&self) -> Option<&BTreeMap<String, String>> {
        self.intents.iter().find_map(|op| match op {
            IntentOperation::TokenDiff { diff } => Some(diff),
            _ => None,
        })
    }
}

/// A single operation inside an intent
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum IntentOperation {
    /// Signed balance deltas keyed by defuse asset id
    TokenDiff { diff: BTreeMap<String, String> },

    /// Withdraw a fungible token out of the intents contract
    FtWithdraw {
        token: String,
        receiver_id: String,
        amount: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        memo: Option<String>,
    },
}

impl IntentOperation {
    pub fn kind(&self) -> &'static str {
        match self {
            IntentOperation::TokenDiff { .. } => "token_diff",
            IntentOperation::FtWithdraw { .. } => "ft_withdraw",
        }
    }
}

/// Build the memo for a withdrawal to `destination`
pub fn withdraw_memo(destination: &str) -> String {
    format!("{WITHDRAW_MEMO_PREFIX}{destination}")
}

/// Extract the destination address from a withdrawal memo
pub fn memo_destination(memo: &str) -> Option<&str> {
    memo.strip_prefix(WITHDRAW_MEMO_PREFIX)
}

/// Payload plus signature as accepted by the solver relay
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedData {
    pub standard: String,
    pub payload: String,
    pub signature: String,
}

impl SignedData {
    pub fn erc191(payload: impl Into<String>, signature: impl Into<String>) -> Self {
        Self {
            standard: ERC191_STANDARD.to_string(),
            payload: payload.into(),
            signature: signature.into(),
        }
    }
}

/// Parameters of a `publish_intent` relay request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishIntentRequest {
    pub signed_data: SignedData,
    pub quote_hashes: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PublishStatus {
    Ok,
    Failed,
}

/// Result of a `publish_intent` relay request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishIntentResponse {
    pub status: PublishStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent_hash: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_intents() -> DefuseIntents {
        let mut diff = BTreeMap::new();
        diff.insert("nep141:usdc.near".to_string(), "-100".to_string());
        diff.insert("nep141:wrap.near".to_string(), "40".to_string());

        DefuseIntents {
            signer_id: "0xabc".to_string(),
            deadline: "2025-03-01T12:00:00.000Z".to_string(),
            nonce: "bm9uY2U=".to_string(),
            verifying_contract: DEFAULT_VERIFYING_CONTRACT.to_string(),
            intents: vec![IntentOperation::TokenDiff { diff }],
        }
    }

    #[test]
    fn test_payload_field_order_is_stable() {
        let payload = sample_intents().payload().unwrap();
        assert_eq!(
            payload,
            r#"{"signer_id":"0xabc","deadline":"2025-03-01T12:00:00.000Z","nonce":"bm9uY2U=","verifying_contract":"intents.near","intents":[{"intent":"token_diff","diff":{"nep141:usdc.near":"-100","nep141:wrap.near":"40"}}]}"#
        );
    }

    #[test]
    fn test_ft_withdraw_tagging() {
        let op = IntentOperation::FtWithdraw {
            token: "usdc.near".to_string(),
            receiver_id: "usdc.near".to_string(),
            amount: "5000".to_string(),
            memo: Some(withdraw_memo("0xdest")),
        };
        let value = serde_json::to_value(&op).unwrap();
        assert_eq!(value["intent"], "ft_withdraw");
        assert_eq!(value["memo"], "WITHDRAW_TO:0xdest");
        assert_eq!(op.kind(), "ft_withdraw");

        let no_memo = IntentOperation::FtWithdraw {
            token: "usdc.near".to_string(),
            receiver_id: "usdc.near".to_string(),
            amount: "5000".to_string(),
            memo: None,
        };
        assert!(serde_json::to_value(&no_memo).unwrap().get("memo").is_none());
    }

    #[test]
    fn test_memo_destination() {
        assert_eq!(memo_destination("WITHDRAW_TO:bc1qxyz"), Some("bc1qxyz"));
        assert_eq!(memo_destination("something else"), None);
    }

    #[test]
    fn test_publish_response_statuses() {
        let ok: PublishIntentResponse =
            serde_json::from_str(r#"{"status":"OK","intent_hash":"abc"}"#).unwrap();
        assert_eq!(ok.status, PublishStatus::Ok);
        assert_eq!(ok.intent_hash.as_deref(), Some("abc"));

        let failed: PublishIntentResponse =
            serde_json::from_str(r#"{"status":"FAILED","reason":"expired"}"#).unwrap();
        assert_eq!(failed.status, PublishStatus::Failed);
        assert_eq!(failed.reason.as_deref(), Some("expired"));
    }
}
