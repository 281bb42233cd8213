//! Domain model structs and DTOs.
//!
//! Each submodule contains a `FromRow` + `Serialize` entity struct matching
//! the database row, plus the insert DTOs the repositories accept.

pub mod category;
pub mod spend_job;
pub mod spending;
pub mod status;
pub mod user;
