//! # duo-gateway
//!
//! WebSocket gateway for the two-party chat service: authenticates
//! session tokens, routes client events through the service layer, and
//! fans room events out locally and across instances.

pub mod broadcast;
pub mod connection;
pub mod handlers;
pub mod limiter;
pub mod protocol;
pub mod server;

pub use server::{create_app, create_gateway_state, run, GatewayState};
