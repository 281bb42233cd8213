//! HTTP surface of the spend-categorization pipeline.
//!
//! Exposes config, state, error mapping, and routes so the binary and the
//! integration tests build the exact same application.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
