//! Request extractors.
//!
//! - [`auth::AuthUser`] -- the caller's identity, forwarded by the gateway.

pub mod auth;
