//! CLI command handlers. Each command is in its own file.

mod download;
mod job_id;
mod status;

pub use download::run_download_job;
pub use job_id::run_job_id;
pub use status::run_status;
