//! NEAR JSON-RPC plumbing: view calls, transaction status, and locally signed
//! function calls.

pub mod account;
pub mod client;
pub mod error;
pub mod jsonrpc;
pub mod outcome;
pub mod signer;
pub mod transaction;

pub use account::{FunctionCall, FunctionCaller, NearAccount};
pub use client::{AccessKeyView, ContractViewer, NearRpcClient, TxStatusProvider};
pub use error::RpcError;
pub use jsonrpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
pub use outcome::{ExecutionStatus, FinalExecutionOutcome};
pub use signer::InMemorySigner;
pub use transaction::DEFAULT_GAS;
