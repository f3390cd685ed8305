//! statecast Gateway HTTP Server
//!
//! Serves the event stream, the action endpoint, the client bootstrap
//! document and a health report over axum.

pub mod actions;
pub mod bootstrap;
pub mod events;
pub mod health_api;
pub mod response;
pub mod server;

pub use server::{build_router, start_server, GatewayState};
