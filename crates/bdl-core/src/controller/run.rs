//! Run one bulk download job to completion.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::classify::{self, ClassifyPolicy, Decision, LocalState, SuffixFilter};
use crate::config::{self, BdlConfig, DownloadConfig};
use crate::job::{JobDir, JobId};
use crate::listing::{BucketLister, ListingReader, ObjectRecord};
use crate::pool::{TaskExecutor, WorkerPool};
use crate::resume_db::{ResumeDb, ResumeEntry};
use crate::signing::{self, Ingress, UrlSigner};
use crate::storage;
use crate::transfer::{self, Timeouts, TransferTask};

use super::counters::{Counters, DownloadReport};
use super::progress::ObjectProgress;

/// Resolved settings for one run.
#[derive(Debug, Clone)]
pub struct JobContext {
    pub download: DownloadConfig,
    pub job_dir: JobDir,
    /// Absolute destination root.
    pub dest_root: PathBuf,
    pub threads: usize,
    pub io_host: String,
    pub signed_url_ttl: Duration,
    pub timeouts: Timeouts,
    pub policy: ClassifyPolicy,
}

impl JobContext {
    pub fn new(download: DownloadConfig, settings: &BdlConfig, threads: usize) -> Result<Self> {
        download.validate()?;
        let threads = config::validate_threads(threads)?;
        let dest_root = absolute(&download.dest_dir)?;
        let id = JobId::new(&download.dest_dir, &download.bucket);
        let job_dir = JobDir::new(&settings.state_root()?, id);
        let policy = ClassifyPolicy {
            suffixes: SuffixFilter::new(download.suffix_list()),
            trust_size_match: settings.trust_size_match,
        };
        Ok(JobContext {
            download,
            job_dir,
            dest_root,
            threads,
            io_host: settings.io_host.clone(),
            signed_url_ttl: Duration::from_secs(settings.signed_url_ttl_secs),
            timeouts: Timeouts::from_secs(settings.connect_timeout_secs, settings.request_timeout_secs),
            policy,
        })
    }

    fn ingress(&self) -> Ingress<'_> {
        match self.download.cdn_domain() {
            Some(cdn) => Ingress::Cdn(cdn),
            None => Ingress::Default(&self.io_host),
        }
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    Ok(std::env::current_dir()
        .context("resolve current directory")?
        .join(path))
}

/// Worker-side half of the controller: run a transfer and count the outcome.
struct TransferExecutor {
    counters: Arc<Counters>,
}

impl TaskExecutor<TransferTask> for TransferExecutor {
    fn execute(&self, task: TransferTask) {
        match transfer::execute(&task) {
            Ok(_) => self.counters.add_success(task.is_resume()),
            Err(e) => {
                if e.is_timeout() {
                    tracing::error!(key = %task.key, "download timed out: {}", e);
                } else {
                    tracing::error!(key = %task.key, "download failed: {}", e);
                }
                self.counters.add_failure();
            }
        }
    }
}

/// Process every listed object and wait for all dispatched transfers.
///
/// Setup failures (job dir, resume store, listing) are returned as errors
/// before any transfer starts. Per-object failures only show up in the report.
/// If `progress_tx` is `Some`, a line is sent for each object as it is classified.
pub async fn run_download(
    ctx: &JobContext,
    signer: &dyn UrlSigner,
    lister: &dyn BucketLister,
    progress_tx: Option<&tokio::sync::mpsc::Sender<ObjectProgress>>,
) -> Result<DownloadReport> {
    let started = Instant::now();
    let dl = &ctx.download;

    ctx.job_dir.create()?;
    let db = ResumeDb::open_at(ctx.job_dir.resume_db_path())
        .await
        .context("open resume store")?;

    let list_path = ctx.job_dir.list_path();
    let prefix = dl.prefix.as_deref().unwrap_or("");
    tracing::info!("listing bucket `{}` by prefix `{}`", dl.bucket, prefix);
    lister
        .list(&dl.bucket, prefix, &list_path)
        .context("list bucket")?;

    let reader = ListingReader::new(&list_path);
    let counters = Arc::new(Counters::default());
    let total = reader.count_valid()?;
    counters.set_total(total);

    let pool = WorkerPool::spawn(
        ctx.threads,
        Arc::new(TransferExecutor {
            counters: Arc::clone(&counters),
        }),
    )?;

    let deadline = signing::deadline_from_now(ctx.signed_url_ttl);
    let mut position = 0u64;
    for record in reader.records()? {
        let record = record?;
        position += 1;

        if !ctx.policy.suffixes.allows(&record.key) {
            counters.add_filtered();
            tracing::info!("skip download `{}`, suffix filter not match", record.key);
            continue;
        }

        if let Some(tx) = progress_tx {
            let _ = tx
                .send(ObjectProgress {
                    key: record.key.clone(),
                    position,
                    total,
                })
                .await;
        }

        let Some(final_path) = storage::local_path(&ctx.dest_root, &record.key) else {
            tracing::error!("key `{}` does not map to a file under {}", record.key, ctx.dest_root.display());
            counters.add_failure();
            continue;
        };
        let temp_path = storage::temp_path(&final_path);
        let local = LocalState {
            final_size: storage::file_size(&final_path),
            temp_size: storage::file_size(&temp_path),
            entry: db.get(&final_path).await?,
        };

        match classify::classify(&record, &local, &ctx.policy) {
            Decision::SkipFiltered => counters.add_filtered(),
            Decision::SkipSatisfied(reason) => {
                tracing::info!(?reason, "local file `{}` exists, same as in bucket, download skip", final_path.display());
                counters.add_satisfied();
            }
            Decision::PromoteTemp => match storage::promote(&temp_path, &final_path) {
                Ok(()) => {
                    tracing::info!("local temp file `{}` is complete, renamed into place", temp_path.display());
                    counters.add_satisfied();
                }
                Err(e) => {
                    tracing::error!("{:#}", e);
                    counters.add_failure();
                }
            },
            decision @ (Decision::Fresh(_) | Decision::Resume { .. }) => {
                let offset = match decision {
                    Decision::Resume { offset } => offset,
                    _ => 0,
                };
                tracing::info!(?decision, "`{}` needs download", record.key);
                db.put(&final_path, ResumeEntry::new(record.mtime, record.size))
                    .await
                    .with_context(|| format!("record resume entry for {}", final_path.display()))?;
                match build_task(ctx, signer, &record, final_path, offset, deadline) {
                    Ok(task) => pool.submit(task).await?,
                    Err(e) => {
                        tracing::error!(key = %record.key, "cannot build request: {:#}", e);
                        counters.add_failure();
                    }
                }
            }
        }
    }

    pool.finish().await?;
    db.close().await;

    let report = counters.report(started.elapsed());
    report.log();
    Ok(report)
}

fn build_task(
    ctx: &JobContext,
    signer: &dyn UrlSigner,
    record: &ObjectRecord,
    final_path: PathBuf,
    offset: u64,
    deadline: i64,
) -> Result<TransferTask> {
    let link = signing::make_download_link(
        signer,
        &ctx.download.bucket_domain,
        ctx.ingress(),
        &record.key,
        deadline,
    )?;
    Ok(TransferTask {
        key: record.key.clone(),
        final_path,
        url: link.url,
        virtual_host: link.virtual_host,
        proxy: ctx.download.proxy().map(str::to_string),
        offset,
        expected_size: record.size,
        timeouts: ctx.timeouts,
    })
}
