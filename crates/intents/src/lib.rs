pub mod assets;
pub mod builder;
pub mod error;
pub mod nonce;

pub use assets::{AssetResolver, TokenRegistry};
pub use builder::{
    aggregate_diff, earliest_deadline, IntentBuilder, SwapIntent, WithdrawRequest,
    DEFAULT_INTENT_TTL_SECS,
};
pub use error::IntentError;
pub use nonce::{IntentsContract, NonceRegistry, NonceService, DEFAULT_MAX_NONCE_ATTEMPTS};
