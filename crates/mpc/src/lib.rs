//! Threshold (MPC) signature coordination.
//!
//! The agent account asks the proxy contract to have the MPC network sign the
//! ERC-191 hash of an intent. The returned `{big_r, s, recovery_id}` triple is
//! normalized into the `secp256k1:` transport form the solver relay accepts.

pub mod coordinator;
pub mod error;
pub mod hash;
pub mod normalize;
pub mod recovery;

pub use coordinator::{
    signature_from_outcome, SigningMethod, ThresholdSigner, DEFAULT_SIGNATURE_POLL_INTERVAL,
    DEFAULT_SIGNATURE_TIMEOUT,
};
pub use error::SignatureError;
pub use hash::{erc191_hash, keccak256, to_hex_prefixed};
pub use normalize::{to_secp256k1, Secp256k1Signature, SECP256K1_PREFIX};
pub use recovery::{derive_evm_address, parse_public_key, recover_public_key};
