use fluxfolio_rpc::RpcError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature request failed: {0}")]
    SignatureRequestFailed(String),

    #[error("signature for transaction {tx_hash} not available after {attempts} status checks")]
    SignatureTimeout { tx_hash: String, attempts: u32 },

    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("signature recovery failed: {0}")]
    RecoveryFailed(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("rpc error: {0}")]
    Rpc(#[from] RpcError),
}
