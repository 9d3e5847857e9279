//! `bdl job-id` – show where a job keeps its state.

use anyhow::Result;
use bdl_core::config;
use bdl_core::job::{JobDir, JobId};
use bdl_core::logging;
use std::path::Path;

pub fn run_job_id(dest: &Path, bucket: &str) -> Result<()> {
    logging::init_logging_stderr(None);
    let settings = config::load_or_init()?;
    let job_dir = JobDir::new(&settings.state_root()?, JobId::new(dest, bucket));
    println!("{}", job_dir.id);
    println!("{}", job_dir.root.display());
    Ok(())
}
