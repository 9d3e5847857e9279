//! `bdl status` – show resume store contents for a job.

use anyhow::Result;
use bdl_core::config::{self, DownloadConfig};
use bdl_core::job::{JobDir, JobId};
use bdl_core::logging;
use bdl_core::resume_db::ResumeDb;
use std::path::Path;

pub async fn run_status(config_path: &Path) -> Result<()> {
    let download = DownloadConfig::load(config_path)?;
    logging::init_logging_stderr(download.log_level.as_deref());
    let settings = config::load_or_init()?;
    let job_dir = JobDir::new(
        &settings.state_root()?,
        JobId::new(&download.dest_dir, &download.bucket),
    );
    let db_path = job_dir.resume_db_path();
    println!("{:<10} {}", "JOB", job_dir.id);
    println!("{:<10} {}", "DIR", job_dir.root.display());
    if !db_path.exists() {
        println!("No resume store yet; the job has not run.");
        return Ok(());
    }
    let db = ResumeDb::open_at(&db_path).await?;
    let tracked = db.count().await?;
    db.close().await;
    println!("{:<10} {}", "TRACKED", tracked);
    Ok(())
}
