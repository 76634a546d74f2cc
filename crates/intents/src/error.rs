use fluxfolio_rpc::RpcError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IntentError {
    #[error("no unused nonce found after {attempts} attempts")]
    NonceExhausted { attempts: u32 },

    #[error("cannot build an intent from zero quotes")]
    EmptyQuoteSet,

    #[error("asset cannot be resolved: {0}")]
    AssetResolution(String),

    #[error("invalid quote {quote_hash}: {reason}")]
    InvalidQuote { quote_hash: String, reason: String },

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("rpc error: {0}")]
    Rpc(#[from] RpcError),
}
