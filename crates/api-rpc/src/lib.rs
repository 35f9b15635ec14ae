//! JSON-RPC API Layer
//!
//! Thin control surface over the pipeline scheduler. Every method answers with
//! the `{success, message, data, error, duration_ms}` envelope.

pub mod error;
pub mod handler;
pub mod server;
pub mod types;

pub use handler::RpcHandler;
pub use server::{RpcServer, RpcServerConfig};
pub use types::Envelope;
