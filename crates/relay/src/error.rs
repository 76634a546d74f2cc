use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RelayError {
    #[error("{method} request timed out after {after_ms}ms")]
    RelayTimeout { method: String, after_ms: u64 },

    #[error("intent rejected: {0}")]
    IntentRejected(String),

    #[error("relay error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("transport error: {0}")]
    Transport(String),
}

impl RelayError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, RelayError::RelayTimeout { .. })
    }
}
