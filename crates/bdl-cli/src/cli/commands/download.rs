//! `bdl download` – run one bulk download job.

use anyhow::{Context, Result};
use bdl_core::config::{self, Account, DownloadConfig};
use bdl_core::controller::{self, JobContext, ObjectProgress};
use bdl_core::listing::ListFileLister;
use bdl_core::logging::{self, LogSettings};
use bdl_core::signing::HmacSigner;
use std::path::Path;

/// Returns whether every object ended up present locally.
pub async fn run_download_job(config_path: &Path, threads: Option<usize>) -> Result<bool> {
    let settings = config::load_or_init()?;
    let download = DownloadConfig::load(config_path)?;
    let threads = threads.unwrap_or(settings.default_threads);
    let ctx = JobContext::new(download, &settings, threads)?;

    // The default log lives in the job dir.
    ctx.job_dir.create()?;
    let log = LogSettings::for_job(&ctx.download, &ctx.job_dir);
    println!("Writing download log to file {}", log.file.display());
    if let Err(e) = logging::init_logging(&log) {
        logging::init_logging_stderr(log.level.as_deref());
        tracing::warn!("cannot write log file, logging to stderr: {:#}", e);
    }
    tracing::info!(job = %ctx.job_dir.id, threads = ctx.threads, "starting download job");

    let account_path = Account::default_path()?;
    let account = Account::load(&account_path).context("load account credentials")?;
    let signer = HmacSigner::new(account);
    let lister = ListFileLister::new(&ctx.download.list_file);

    let (progress_tx, mut progress_rx) = tokio::sync::mpsc::channel::<ObjectProgress>(64);
    let progress_handle = tokio::spawn(async move {
        while let Some(progress) = progress_rx.recv().await {
            println!("{}", progress);
        }
    });

    let result = controller::run_download(&ctx, &signer, &lister, Some(&progress_tx)).await;
    drop(progress_tx);
    let _ = progress_handle.await;
    let report = result?;

    println!(
        "Total: {}, exists: {}, success: {}, update: {}, failure: {}, filtered: {}",
        report.total,
        report.satisfied,
        report.success,
        report.resumed,
        report.failure,
        report.filtered
    );
    println!("See download log at path {}", log.file.display());
    Ok(!report.has_failures())
}
