//! API server implementation
//!
//! Provides the REST surface over the relay service.

pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;

pub use server::{ApiServer, AppState};
