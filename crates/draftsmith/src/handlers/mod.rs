//! HTTP request handlers.

mod health;
mod rpc;

pub use health::{health, livez, readyz};
pub use rpc::rpc;
