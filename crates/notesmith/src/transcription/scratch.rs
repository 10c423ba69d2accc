//! Request-scoped scratch storage for transcription.
//!
//! A [`ScratchArea`] is a root directory owned by the pipeline. Each request
//! acquires its own uniquely named [`ScratchSpace`] under it; the directory and
//! everything in it is removed when the last handle to the space is dropped, on
//! success, error, panic or timeout alike.

use crate::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

const SPACE_PREFIX: &str = "req-";

/// Root directory under which request scratch spaces are created.
#[derive(Debug, Clone)]
pub struct ScratchArea {
    root: PathBuf,
}

impl ScratchArea {
    /// Use `root` as the scratch area, creating it if needed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Acquire a fresh space for one request.
    pub fn acquire(&self) -> Result<ScratchSpace> {
        let dir = tempfile::Builder::new().prefix(SPACE_PREFIX).tempdir_in(&self.root)?;
        tracing::debug!(path = %dir.path().display(), "Acquired scratch space");
        Ok(ScratchSpace { dir: Arc::new(dir) })
    }

    /// Number of request spaces currently present under the root.
    pub fn active_spaces(&self) -> Result<usize> {
        let mut count = 0;
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_name().to_string_lossy().starts_with(SPACE_PREFIX) {
                count += 1;
            }
        }
        Ok(count)
    }
}

/// One request's private scratch directory.
///
/// Clones share the same directory, which is deleted once every clone is gone.
/// Blocking decode work holds a clone so the files it writes outlive an
/// abandoned request only until that work finishes.
#[derive(Debug, Clone)]
pub struct ScratchSpace {
    dir: Arc<TempDir>,
}

impl ScratchSpace {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of a file inside this space. Only the final component of `name` is used.
    pub fn file(&self, name: &str) -> PathBuf {
        let name = Path::new(name)
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "file".into());
        self.dir.path().join(name)
    }

    /// Write `bytes` to `name` inside the space.
    pub async fn write(&self, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.file(name);
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }

    /// Remove the space now, reporting failures instead of ignoring them.
    ///
    /// If other clones are still alive the directory is left for the last one
    /// to drop.
    pub fn close(self) {
        match Arc::try_unwrap(self.dir) {
            Ok(dir) => {
                let path = dir.path().to_path_buf();
                if let Err(e) = dir.close() {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to remove scratch space");
                } else {
                    tracing::debug!(path = %path.display(), "Released scratch space");
                }
            }
            Err(_) => {
                tracing::debug!("Scratch space still in use, deferring removal");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_spaces_are_unique() {
        let root = tempdir().unwrap();
        let area = ScratchArea::new(root.path()).unwrap();

        let a = area.acquire().unwrap();
        let b = area.acquire().unwrap();
        assert_ne!(a.path(), b.path());
        assert_eq!(area.active_spaces().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_drop_removes_files() {
        let root = tempdir().unwrap();
        let area = ScratchArea::new(root.path()).unwrap();

        let space = area.acquire().unwrap();
        let path = space.write("input.mp4", b"data").await.unwrap();
        assert!(path.exists());

        drop(space);
        assert!(!path.exists());
        assert_eq!(area.active_spaces().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_close_waits_for_last_clone() {
        let root = tempdir().unwrap();
        let area = ScratchArea::new(root.path()).unwrap();

        let space = area.acquire().unwrap();
        let held = space.clone();
        let dir = space.path().to_path_buf();

        space.close();
        assert!(dir.exists());

        drop(held);
        assert!(!dir.exists());
    }

    #[test]
    fn test_file_strips_directories() {
        let root = tempdir().unwrap();
        let area = ScratchArea::new(root.path()).unwrap();
        let space = area.acquire().unwrap();

        let path = space.file("../../etc/passwd");
        assert_eq!(path.parent().unwrap(), space.path());
        assert!(path.ends_with("passwd"));
    }

    #[test]
    fn test_new_creates_missing_root() {
        let root = tempdir().unwrap();
        let nested = root.path().join("nested").join("scratch");
        let area = ScratchArea::new(&nested).unwrap();
        assert!(area.root().is_dir());
        assert_eq!(area.active_spaces().unwrap(), 0);
    }
}
