use fluxfolio_intents::IntentError;
use fluxfolio_jobs::StoreError;
use fluxfolio_mpc::SignatureError;
use fluxfolio_relay::RelayError;
use fluxfolio_rpc::RpcError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrchestratorError {
    #[error(transparent)]
    Intent(#[from] IntentError),

    #[error(transparent)]
    Signature(#[from] SignatureError),

    #[error(transparent)]
    Relay(#[from] RelayError),

    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("intent {intent_hash} not settled after {attempts} status checks")]
    SettlementTimeout { intent_hash: String, attempts: u32 },

    #[error("intent {intent_hash} rejected: {reason}")]
    IntentRejected { intent_hash: String, reason: String },

    #[error("user {user_id} is missing {what}")]
    MissingPrerequisite { user_id: String, what: &'static str },

    #[error("user {0} already has an account")]
    AccountExists(String),

    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("invalid account: {0}")]
    InvalidAccount(String),

    #[error("invalid allocation: {0}")]
    InvalidAllocation(String),

    #[error("unexpected contract response: {0}")]
    UnexpectedResponse(String),
}

impl OrchestratorError {
    /// Label used for the `error_type` field and error metrics
    pub fn error_type(&self) -> &'static str {
        match self {
            OrchestratorError::Intent(_) => "intent",
            OrchestratorError::Signature(_) => "signature",
            OrchestratorError::Relay(_) => "relay",
            OrchestratorError::Rpc(_) => "rpc",
            OrchestratorError::Store(_) => "store",
            OrchestratorError::SettlementTimeout { .. } => "settlement_timeout",
            OrchestratorError::IntentRejected { .. } => "intent_rejected",
            OrchestratorError::MissingPrerequisite { .. } => "missing_prerequisite",
            OrchestratorError::AccountExists(_) => "account_exists",
            OrchestratorError::UserNotFound(_) => "user_not_found",
            OrchestratorError::InvalidAccount(_) => "invalid_account",
            OrchestratorError::InvalidAllocation(_) => "invalid_allocation",
            OrchestratorError::UnexpectedResponse(_) => "unexpected_response",
        }
    }
}
