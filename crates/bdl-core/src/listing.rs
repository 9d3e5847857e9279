//! Bucket listing snapshot: one tab-separated object record per line.
//!
//! Line format: `key \t size \t etag \t mtime [\t mime [\t end_user]]`.
//! Malformed lines are logged and skipped; they never count toward the total.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// One object from the bucket listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRecord {
    pub key: String,
    pub size: u64,
    pub etag: String,
    pub mtime: i64,
    pub mime: Option<String>,
    pub end_user: Option<String>,
}

/// Why a listing line was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("expected at least 4 tab-separated fields, got {0}")]
    TooFewFields(usize),
    #[error("invalid size `{0}`")]
    Size(String),
    #[error("invalid modification time `{0}`")]
    Mtime(String),
}

/// Parse one listing line.
pub fn parse_line(line: &str) -> Result<ObjectRecord, RecordError> {
    let line = line.trim();
    let items: Vec<&str> = line.split('\t').collect();
    if line.is_empty() || items.len() < 4 {
        return Err(RecordError::TooFewFields(if line.is_empty() { 0 } else { items.len() }));
    }
    let size = items[1]
        .parse::<u64>()
        .map_err(|_| RecordError::Size(items[1].to_string()))?;
    let mtime = items[3]
        .parse::<i64>()
        .map_err(|_| RecordError::Mtime(items[3].to_string()))?;
    let opt = |i: usize| items.get(i).map(|s| s.to_string()).filter(|s| !s.is_empty());
    Ok(ObjectRecord {
        key: items[0].to_string(),
        size,
        etag: items[2].to_string(),
        mtime,
        mime: opt(4),
        end_user: opt(5),
    })
}

/// Produces a listing snapshot for a bucket.
pub trait BucketLister {
    /// Write the records of `bucket` whose keys start with `prefix` to `out`.
    fn list(&self, bucket: &str, prefix: &str, out: &Path) -> Result<()>;
}

/// Lister backed by a listing file produced ahead of time.
#[derive(Debug, Clone)]
pub struct ListFileLister {
    source: PathBuf,
}

impl ListFileLister {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        ListFileLister {
            source: source.into(),
        }
    }
}

impl BucketLister for ListFileLister {
    fn list(&self, bucket: &str, prefix: &str, out: &Path) -> Result<()> {
        let src = File::open(&self.source)
            .with_context(|| format!("open listing {}", self.source.display()))?;
        let dst = File::create(out)
            .with_context(|| format!("create listing snapshot {}", out.display()))?;
        let mut writer = BufWriter::new(dst);
        let mut kept = 0u64;
        for line in BufReader::new(src).lines() {
            let line = line.with_context(|| format!("read listing {}", self.source.display()))?;
            let key = line.split('\t').next().unwrap_or("");
            if key.starts_with(prefix) {
                writeln!(writer, "{}", line)?;
                kept += 1;
            }
        }
        writer.flush()?;
        tracing::info!(bucket, prefix, lines = kept, "listing snapshot written to {}", out.display());
        Ok(())
    }
}

/// Reads records from a listing snapshot in file order.
pub struct ListingReader {
    path: PathBuf,
}

impl ListingReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ListingReader { path: path.into() }
    }

    /// Number of well-formed records.
    pub fn count_valid(&self) -> Result<u64> {
        let mut n = 0;
        for line in self.lines()? {
            if parse_line(&line?).is_ok() {
                n += 1;
            }
        }
        Ok(n)
    }

    /// Well-formed records in file order; malformed lines are logged and skipped.
    pub fn records(&self) -> Result<impl Iterator<Item = Result<ObjectRecord>>> {
        let lines = self.lines()?;
        Ok(lines.filter_map(|line| match line {
            Err(e) => Some(Err(e)),
            Ok(line) => match parse_line(&line) {
                Ok(rec) => Some(Ok(rec)),
                Err(e) => {
                    tracing::error!("invalid list line `{}`: {}", line, e);
                    None
                }
            },
        }))
    }

    fn lines(&self) -> Result<impl Iterator<Item = Result<String>>> {
        let file = File::open(&self.path)
            .with_context(|| format!("open list file {}", self.path.display()))?;
        let path = self.path.clone();
        Ok(BufReader::new(file).lines().map(move |l| {
            l.with_context(|| format!("read list file {}", path.display()))
        }))
    }
}
