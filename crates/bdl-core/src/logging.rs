//! Logging init: job log file with daily rotation, optional stderr echo, or
//! graceful fallback to stderr.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration as ChronoDuration, Local, NaiveDate};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

use crate::config::DownloadConfig;
use crate::job::JobDir;

/// Operational logging options for one run.
#[derive(Debug, Clone)]
pub struct LogSettings {
    /// `debug`, `info`, `warn` or `error`; anything else means `info`.
    pub level: Option<String>,
    pub file: PathBuf,
    /// Days of rotated files to keep (at least 1).
    pub rotate_days: u32,
    /// Also write events to stderr.
    pub echo: bool,
}

impl LogSettings {
    /// Settings from a job config; the log lands in the job dir unless `log_file` is set.
    pub fn for_job(download: &DownloadConfig, job_dir: &JobDir) -> Self {
        LogSettings {
            level: download.log_level.clone(),
            file: download
                .log_file
                .clone()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| job_dir.default_log_path()),
            rotate_days: download.log_rotate.unwrap_or(1).max(1),
            echo: download.log_stdout,
        }
    }
}

/// Map a configured level name to a filter directive.
pub fn level_directive(level: Option<&str>) -> &'static str {
    match level.map(str::trim) {
        Some("debug") => "debug",
        Some("info") => "info",
        Some("warn") => "warn",
        Some("error") => "error",
        _ => "info",
    }
}

fn env_filter(level: Option<&str>) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},sqlx=warn", level_directive(level))))
}

/// Writer that is either a file or stderr (used when file clone fails).
enum FileOrStderr {
    File(std::fs::File),
    Stderr,
}

impl io::Write for FileOrStderr {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            FileOrStderr::File(f) => f.write(buf),
            FileOrStderr::Stderr => io::stderr().lock().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            FileOrStderr::File(f) => f.flush(),
            FileOrStderr::Stderr => io::stderr().lock().flush(),
        }
    }
}

struct FileMakeWriter(std::fs::File);

impl<'a> MakeWriter<'a> for FileMakeWriter {
    type Writer = FileOrStderr;

    fn make_writer(&'a self) -> Self::Writer {
        self.0
            .try_clone()
            .map(FileOrStderr::File)
            .unwrap_or(FileOrStderr::Stderr)
    }
}

/// Initialize structured logging to `settings.file`, rotating first.
/// On failure (e.g. log dir unwritable), returns Err so the caller can fall back to stderr.
pub fn init_logging(settings: &LogSettings) -> Result<()> {
    if let Some(parent) = settings.file.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let rotated = rotate_log(&settings.file, settings.rotate_days, Local::now())?;

    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&settings.file)
        .with_context(|| format!("open log file {}", settings.file.display()))?;

    let writer: BoxMakeWriter = if settings.echo {
        BoxMakeWriter::new(FileMakeWriter(file).and(io::stderr))
    } else {
        BoxMakeWriter::new(FileMakeWriter(file))
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(settings.level.as_deref()))
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("logging already initialized: {}", e))?;

    tracing::info!("bdl logging initialized at {}", settings.file.display());
    if let Some(old) = rotated {
        tracing::info!("rotated previous log to {}", old.display());
    }
    Ok(())
}

/// Initialize logging to stderr only (no file). Use when init_logging() fails so the CLI doesn't crash.
pub fn init_logging_stderr(level: Option<&str>) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_writer(io::stderr)
        .with_ansi(false)
        .try_init();
}

fn rotated_name(path: &Path, date: NaiveDate) -> Option<PathBuf> {
    let name = path.file_name()?.to_string_lossy();
    Some(path.with_file_name(format!("{}.{}", name, date.format("%Y-%m-%d"))))
}

/// Daily rotation. A log last written before `now`'s day is renamed to
/// `<file>.<YYYY-MM-DD>`; rotated files older than `keep_days` are removed.
/// Returns the path the old log was moved to, if any.
pub fn rotate_log(path: &Path, keep_days: u32, now: DateTime<Local>) -> Result<Option<PathBuf>> {
    let today = now.date_naive();
    let mut rotated = None;
    if let Ok(meta) = fs::metadata(path) {
        let modified: DateTime<Local> = meta.modified()?.into();
        let day = modified.date_naive();
        if day < today {
            if let Some(target) = rotated_name(path, day) {
                fs::rename(path, &target)
                    .with_context(|| format!("rotate log {}", path.display()))?;
                rotated = Some(target);
            }
        }
    }
    prune_rotated(path, keep_days, today)?;
    Ok(rotated)
}

fn prune_rotated(path: &Path, keep_days: u32, today: NaiveDate) -> Result<()> {
    let (Some(dir), Some(name)) = (path.parent(), path.file_name()) else {
        return Ok(());
    };
    let dir = if dir.as_os_str().is_empty() { Path::new(".") } else { dir };
    let prefix = format!("{}.", name.to_string_lossy());
    let cutoff = today - ChronoDuration::days(i64::from(keep_days.max(1)));
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_name = entry.file_name();
        let file_name = file_name.to_string_lossy();
        let Some(suffix) = file_name.strip_prefix(&prefix) else {
            continue;
        };
        let Ok(date) = NaiveDate::parse_from_str(suffix, "%Y-%m-%d") else {
            continue;
        };
        if date < cutoff {
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}
