pub mod spend_jobs;
