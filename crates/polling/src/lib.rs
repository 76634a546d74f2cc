//! Bounded polling and timeout primitives shared by every loop that waits on
//! a remote system: the signature fallback, the settlement wait and the job
//! poller.

pub mod poll;
pub mod timeout;

pub use poll::{poll_until, PollConfig, PollError, PollOutcome};
pub use timeout::{with_timeout, TimedOut};
