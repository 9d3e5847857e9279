//! Disk I/O and file lifecycle for one object.
//!
//! Bytes are streamed into `<final>.tmp`, opened with truncation for a fresh
//! download or in append mode for a resume. Only a complete transfer renames
//! the temp file onto the final path.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".tmp";

/// Path for the temp file: appends `.tmp` to the final path (e.g. `a/b.png` -> `a/b.png.tmp`).
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

/// Local path for an object key under `dest_root`.
///
/// Leading `/` and `.` segments are dropped. Returns `None` for keys that would
/// escape `dest_root` (`..`) or name no file at all.
pub fn local_path(dest_root: &Path, key: &str) -> Option<PathBuf> {
    let mut out = dest_root.to_path_buf();
    let mut pushed = false;
    for component in Path::new(key).components() {
        match component {
            Component::Normal(part) => {
                out.push(part);
                pushed = true;
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            Component::ParentDir => return None,
        }
    }
    pushed.then_some(out)
}

/// Size of a regular file, or `None` if it does not exist (or is not a file).
pub fn file_size(path: &Path) -> Option<u64> {
    std::fs::metadata(path)
        .ok()
        .filter(|m| m.is_file())
        .map(|m| m.len())
}

/// Create the parent directory of `path` if needed.
pub fn ensure_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

/// Rename an already complete temp file onto its final path.
pub fn promote(temp: &Path, final_path: &Path) -> Result<()> {
    std::fs::rename(temp, final_path).with_context(|| {
        format!(
            "failed to rename {} to {}",
            temp.display(),
            final_path.display()
        )
    })
}

/// Sequential writer for a temp download file.
pub struct TempFile {
    file: File,
    temp_path: PathBuf,
    written: u64,
}

impl TempFile {
    /// Create (or truncate) the temp file for a download from offset 0.
    pub fn create(temp_path: &Path) -> std::io::Result<Self> {
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(temp_path)?;
        Ok(TempFile {
            file,
            temp_path: temp_path.to_path_buf(),
            written: 0,
        })
    }

    /// Open an existing temp file for appending (resume). The file must exist.
    pub fn append(temp_path: &Path) -> std::io::Result<Self> {
        let file = File::options().append(true).open(temp_path)?;
        Ok(TempFile {
            file,
            temp_path: temp_path.to_path_buf(),
            written: 0,
        })
    }

    pub fn write_chunk(&mut self, data: &[u8]) -> std::io::Result<()> {
        self.file.write_all(data)?;
        self.written += data.len() as u64;
        Ok(())
    }

    /// Bytes written through this handle (not counting pre-existing content).
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Flush, close, and atomically rename to `final_path`. Fails if `final_path`
    /// is on a different filesystem.
    pub fn finalize(self, final_path: &Path) -> std::io::Result<u64> {
        let TempFile {
            mut file,
            temp_path,
            written,
        } = self;
        file.flush()?;
        drop(file);
        std::fs::rename(&temp_path, final_path)?;
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_path_appends_tmp() {
        let p = temp_path(Path::new("file.iso"));
        assert_eq!(p.to_string_lossy(), "file.iso.tmp");
        let p2 = temp_path(Path::new("/dest/a/b.png"));
        assert_eq!(p2.to_string_lossy(), "/dest/a/b.png.tmp");
    }

    #[test]
    fn local_path_stays_under_root() {
        let root = Path::new("/dest");
        assert_eq!(local_path(root, "a/b.png"), Some(PathBuf::from("/dest/a/b.png")));
        assert_eq!(local_path(root, "/a/./b.png"), Some(PathBuf::from("/dest/a/b.png")));
        assert_eq!(local_path(root, "a/../../etc/passwd"), None);
        assert_eq!(local_path(root, ""), None);
        assert_eq!(local_path(root, "/"), None);
    }

    #[test]
    fn create_write_finalize() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("out.bin");
        let tp = temp_path(&final_path);

        let mut tmp = TempFile::create(&tp).unwrap();
        tmp.write_chunk(b"hello ").unwrap();
        tmp.write_chunk(b"world").unwrap();
        assert_eq!(tmp.written(), 11);
        assert_eq!(tmp.finalize(&final_path).unwrap(), 11);

        assert!(!tp.exists());
        assert_eq!(std::fs::read(&final_path).unwrap(), b"hello world");
    }

    #[test]
    fn create_truncates_stale_temp() {
        let dir = tempfile::tempdir().unwrap();
        let tp = dir.path().join("x.tmp");
        std::fs::write(&tp, b"stale stale stale").unwrap();
        let mut tmp = TempFile::create(&tp).unwrap();
        tmp.write_chunk(b"new").unwrap();
        drop(tmp);
        assert_eq!(std::fs::read(&tp).unwrap(), b"new");
    }

    #[test]
    fn append_continues_existing_temp() {
        let dir = tempfile::tempdir().unwrap();
        let tp = dir.path().join("x.tmp");
        std::fs::write(&tp, b"0123").unwrap();
        let mut tmp = TempFile::append(&tp).unwrap();
        tmp.write_chunk(b"4567").unwrap();
        assert_eq!(tmp.written(), 4);
        let final_path = dir.path().join("x");
        tmp.finalize(&final_path).unwrap();
        assert_eq!(std::fs::read(&final_path).unwrap(), b"01234567");
    }

    #[test]
    fn append_requires_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(TempFile::append(&dir.path().join("missing.tmp")).is_err());
    }

    #[test]
    fn file_size_and_promote() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("sub").join("f");
        assert_eq!(file_size(&final_path), None);
        ensure_parent(&final_path).unwrap();
        let tp = temp_path(&final_path);
        std::fs::write(&tp, b"abc").unwrap();
        assert_eq!(file_size(&tp), Some(3));
        promote(&tp, &final_path).unwrap();
        assert_eq!(file_size(&final_path), Some(3));
        assert_eq!(file_size(&tp), None);
        assert_eq!(file_size(dir.path()), None);
    }
}
