//! Clients for the defuse solver relay (quotes, intent publication,
//! settlement status) and the deposit bridge.

pub mod client;
pub mod error;

pub use client::{
    DepositBridge, RelayClient, SolverRelay, DEFAULT_BRIDGE_URL, DEFAULT_RELAY_TIMEOUT,
    DEFAULT_SOLVER_RELAY_URL,
};
pub use error::RelayError;
