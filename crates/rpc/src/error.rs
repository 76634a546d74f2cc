use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RpcError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("rpc request timed out after {0}ms")]
    Timeout(u64),

    #[error("rpc error {name}: {message}")]
    Rpc { name: String, message: String },

    #[error("failed to decode rpc response: {0}")]
    Decode(String),

    #[error("view call {method} failed: {message}")]
    ViewFailed { method: String, message: String },

    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Broadcast happened but the final outcome was not observed
    #[error("transaction {tx_hash} not confirmed: {reason}")]
    Unconfirmed { tx_hash: String, reason: String },
}

impl RpcError {
    /// Hash of a transaction that may still land on chain
    pub fn tx_hash(&self) -> Option<&str> {
        match self {
            RpcError::Unconfirmed { tx_hash, .. } => Some(tx_hash),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            RpcError::Timeout(_) => true,
            RpcError::Rpc { name, .. } => name == TIMEOUT_ERROR,
            _ => false,
        }
    }
}

/// Error cause the node reports when it stops waiting on a transaction
pub const TIMEOUT_ERROR: &str = "TIMEOUT_ERROR";
