//! Messenger abstractions: inbound event shapes, outbound payloads and the
//! port the Discord adapter implements.

pub mod port;
pub mod throttled;
pub mod types;
