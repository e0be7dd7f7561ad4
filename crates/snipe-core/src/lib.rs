//! Core domain + application logic for the snipe bot.
//!
//! This crate is intentionally framework-agnostic. Discord (gateway, REST,
//! role lookup) lives behind ports (traits) implemented in adapter crates.

pub mod cache;
pub mod config;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod logging;
pub mod messaging;
pub mod notify;
pub mod ports;
pub mod router;
pub mod status;

#[cfg(test)]
pub(crate) mod test_support;

pub use errors::{Error, Result};
