pub mod account;
pub mod intent;
pub mod job;
pub mod quote;
pub mod signature;
pub mod status;

pub use account::*;
pub use intent::*;
pub use job::*;
pub use quote::*;
pub use signature::*;
pub use status::*;
