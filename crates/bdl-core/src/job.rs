//! Job identity and the per-job working directory.
//!
//! A job is the pair (destination directory, bucket). Its working directory
//! keeps the listing snapshot, the resume store and the default log file, and
//! is left on disk so a later run can resume.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Hex MD5 of `"<dest_dir>:<bucket>"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobId(String);

impl JobId {
    pub fn new(dest_dir: &Path, bucket: &str) -> Self {
        let digest = md5::compute(format!("{}:{}", dest_dir.display(), bucket));
        JobId(format!("{:x}", digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Paths inside `<state root>/qdownload/<job id>/`.
#[derive(Debug, Clone)]
pub struct JobDir {
    pub id: JobId,
    pub root: PathBuf,
}

impl JobDir {
    pub fn new(state_root: &Path, id: JobId) -> Self {
        let root = state_root.join("qdownload").join(id.as_str());
        JobDir { id, root }
    }

    /// Create the directory if needed.
    pub fn create(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root)
            .with_context(|| format!("failed to create job dir {}", self.root.display()))
    }

    pub fn list_path(&self) -> PathBuf {
        self.root.join(format!("{}.list", self.id))
    }

    pub fn resume_db_path(&self) -> PathBuf {
        self.root.join(format!("{}.db", self.id))
    }

    pub fn default_log_path(&self) -> PathBuf {
        self.root.join(format!("{}.log", self.id))
    }
}
