//! Relay gateway
//!
//! Owns the process-level state (buffer, adapter, handlers, scheduler) and
//! drives its lifecycle.

mod server;

pub use server::{Gateway, GatewayBuilder, GatewayState};
