//! Types stored in the resume store.

use std::fmt;

/// Remote state recorded for a local path, stored as `"<mtime>|<size>"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResumeEntry {
    pub mtime: i64,
    pub size: u64,
}

impl ResumeEntry {
    pub fn new(mtime: i64, size: u64) -> Self {
        ResumeEntry { mtime, size }
    }

    pub fn encode(&self) -> String {
        format!("{}|{}", self.mtime, self.size)
    }

    /// Parse a stored value. Returns `None` for anything not of the form `mtime|size`.
    pub fn decode(value: &str) -> Option<Self> {
        let (mtime, size) = value.split_once('|')?;
        Some(ResumeEntry {
            mtime: mtime.trim().parse().ok()?,
            size: size.trim().parse().ok()?,
        })
    }
}

impl fmt::Display for ResumeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}
