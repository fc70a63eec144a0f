//! On/off control of an external broadcast relay.

pub mod client;
pub mod error;

pub use client::{RelayClient, RelayStatus};
pub use error::RelayError;
