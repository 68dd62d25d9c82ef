//! Connection management for the broker session
//!
//! This module handles:
//! - Building client options and loading TLS material
//! - Subscribing to the command topics on every connect
//! - Forwarding inbound messages as events

mod manager;

pub use manager::{ConnectionEvent, ConnectionManager};
