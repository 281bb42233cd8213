//! Pure domain logic for the spend-categorization pipeline.
//!
//! No I/O lives here: submission validation, apportionment, parsing and
//! validating classification output, and prompt construction are all
//! plain functions so the worker, the API, and tests share one definition.

pub mod apportion;
pub mod classification;
pub mod error;
pub mod prompt;
pub mod submission;
pub mod types;
