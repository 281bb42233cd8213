//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods. Reads
//! take `&PgPool`; writes that must join a caller's transaction take
//! `&mut PgConnection` so they can run on `&mut *tx`.

pub mod category_repo;
pub mod spend_job_repo;
pub mod spending_repo;
pub mod user_repo;

pub use category_repo::CategoryRepo;
pub use spend_job_repo::SpendJobRepo;
pub use spending_repo::SpendingRepo;
pub use user_repo::UserRepo;
