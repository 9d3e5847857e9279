//! One object's retrieval: GET (optionally ranged) into `<final>.tmp`, then
//! rename onto the final path.
//!
//! Runs in the current thread; the worker pool calls it from the blocking pool.
//! A failed copy leaves the partial temp file in place so a later run can
//! resume it. Nothing is renamed unless the whole body arrived without error.

mod error;
mod throughput;

pub use error::TransferError;
pub use throughput::Throughput;

use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::storage::{self, TempFile};

/// Connection and whole-request limits for a transfer.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    pub connect: Duration,
    /// `None` = no deadline.
    pub request: Option<Duration>,
}

impl Default for Timeouts {
    fn default() -> Self {
        Timeouts {
            connect: Duration::from_secs(30),
            request: Some(Duration::from_secs(3600)),
        }
    }
}

impl Timeouts {
    pub fn from_secs(connect_secs: u64, request_secs: u64) -> Self {
        Timeouts {
            connect: Duration::from_secs(connect_secs.max(1)),
            request: (request_secs > 0).then(|| Duration::from_secs(request_secs)),
        }
    }
}

/// Everything a worker needs to fetch one object. Built once per object by
/// the controller and moved into the pool.
#[derive(Debug, Clone)]
pub struct TransferTask {
    pub key: String,
    pub final_path: PathBuf,
    pub url: String,
    /// Sent as `Host`; the URL may point at a different physical ingress.
    pub virtual_host: String,
    pub proxy: Option<String>,
    /// Resume from this byte of the temp file (0 = fresh download).
    pub offset: u64,
    pub expected_size: u64,
    pub timeouts: Timeouts,
}

impl TransferTask {
    pub fn is_resume(&self) -> bool {
        self.offset > 0
    }

    pub fn temp_path(&self) -> PathBuf {
        storage::temp_path(&self.final_path)
    }
}

/// Bytes received by a successful transfer.
#[derive(Debug, Clone, Copy)]
pub struct TransferStats {
    pub bytes: u64,
    pub throughput: Throughput,
}

/// Prefix `http://` when the proxy address has no http scheme, and validate it.
pub fn normalize_proxy(raw: &str) -> Result<String, TransferError> {
    let raw = raw.trim();
    let candidate = if raw.starts_with("http") {
        raw.to_string()
    } else {
        format!("http://{}", raw)
    };
    match url::Url::parse(&candidate) {
        Ok(u) if u.host_str().is_some() => Ok(candidate),
        _ => Err(TransferError::Proxy(raw.to_string())),
    }
}

/// Status code from an HTTP status line (`HTTP/1.1 206 Partial Content`).
fn parse_status_line(line: &[u8]) -> Option<u32> {
    let line = std::str::from_utf8(line).ok()?;
    if !line.starts_with("HTTP/") {
        return None;
    }
    line.split_whitespace().nth(1)?.parse().ok()
}

fn is_success(code: u32) -> bool {
    (200..300).contains(&code)
}

/// Open the temp file for the body. A resume only appends when the server
/// honoured the range; a plain 200 carries the whole object and starts over.
fn open_sink(temp: &Path, resume: bool, status: u32) -> std::io::Result<TempFile> {
    if resume && status == 206 {
        TempFile::append(temp)
    } else {
        TempFile::create(temp)
    }
}

/// Fetch `task` to its final path.
pub fn execute(task: &TransferTask) -> Result<TransferStats, TransferError> {
    let started = Instant::now();
    storage::ensure_parent(&task.final_path).map_err(TransferError::Io)?;
    let temp = task.temp_path();
    let resume = task.is_resume();

    let mut easy = curl::easy::Easy::new();
    easy.url(&task.url)?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.connect_timeout(task.timeouts.connect)?;
    if let Some(deadline) = task.timeouts.request {
        easy.timeout(deadline)?;
    }
    match &task.proxy {
        Some(proxy) => easy.proxy(&normalize_proxy(proxy)?)?,
        // Empty string disables proxies picked up from the environment.
        None => easy.proxy("")?,
    }
    if resume {
        // curl expects "start-" (open-ended), not "bytes=start-".
        easy.range(&format!("{}-", task.offset))?;
    }
    let mut list = curl::easy::List::new();
    list.append(&format!("Host: {}", task.virtual_host))?;
    easy.http_headers(list)?;

    tracing::info!(
        key = %task.key,
        path = %task.final_path.display(),
        offset = task.offset,
        "downloading"
    );

    let status = Cell::new(0u32);
    let mut sink: Option<TempFile> = None;
    let mut write_error: Option<std::io::Error> = None;
    let performed = {
        let mut transfer = easy.transfer();
        transfer.header_function(|line| {
            if let Some(code) = parse_status_line(line) {
                status.set(code);
            }
            true
        })?;
        transfer.write_function(|data| {
            let code = status.get();
            if !is_success(code) {
                // Error bodies are discarded; the status is reported after perform.
                return Ok(data.len());
            }
            if sink.is_none() {
                match open_sink(&temp, resume, code) {
                    Ok(file) => sink = Some(file),
                    Err(e) => {
                        write_error = Some(e);
                        return Ok(0);
                    }
                }
            }
            if let Some(file) = sink.as_mut() {
                if let Err(e) = file.write_chunk(data) {
                    write_error = Some(e);
                    return Ok(0);
                }
            }
            Ok(data.len())
        })?;
        transfer.perform()
    };

    if let Some(e) = write_error {
        tracing::error!(key = %task.key, "write to {} failed: {}", temp.display(), e);
        return Err(TransferError::Io(e));
    }
    if let Err(e) = performed {
        tracing::error!(key = %task.key, url = %task.url, "download failed: {}", e);
        return Err(TransferError::Curl(e));
    }
    let code = easy.response_code()?;
    if !is_success(code) {
        tracing::warn!(key = %task.key, url = %task.url, "download failed with HTTP {}", code);
        return Err(TransferError::Http(code));
    }

    let sink = match sink {
        Some(file) => file,
        // Empty body: the object (or its remainder) is zero bytes long.
        None => open_sink(&temp, resume, code).map_err(TransferError::Io)?,
    };
    let bytes = sink.written();
    sink.finalize(&task.final_path).map_err(|e| {
        tracing::error!(key = %task.key, "rename {} failed: {}", temp.display(), e);
        TransferError::Rename(e)
    })?;

    if let Some(size) = storage::file_size(&task.final_path) {
        if size != task.expected_size {
            tracing::warn!(
                key = %task.key,
                size,
                expected = task.expected_size,
                "downloaded size differs from listing"
            );
        }
    }

    let throughput = Throughput::new(bytes, started.elapsed());
    tracing::info!(
        key = %task.key,
        path = %task.final_path.display(),
        bytes,
        rate = %throughput,
        "download success"
    );
    Ok(TransferStats { bytes, throughput })
}
