//! Per-run scratch directories.

use std::io;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::TomeResult;

/// A uniquely named directory that holds one archive's extracted contents.
///
/// The directory is removed by [`ScratchDir::cleanup`] or, failing that,
/// when the guard is dropped, so early returns, panics and cancelled
/// futures do not leak extracted files.
#[derive(Debug)]
pub struct ScratchDir {
    id: Uuid,
    path: PathBuf,
    removed: bool,
}

impl ScratchDir {
    /// Create `<root>/<uuid-v4>`, creating `root` as needed.
    pub async fn create(root: &Path) -> TomeResult<Self> {
        let id = Uuid::new_v4();
        let path = root.join(id.to_string());
        tokio::fs::create_dir_all(&path).await?;
        tracing::debug!(path = %path.display(), "Created scratch directory");
        Ok(Self {
            id,
            path,
            removed: false,
        })
    }

    /// Run identifier, also the directory name.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Recursively delete the directory. A directory that is already gone
    /// counts as removed, so calling this twice is fine.
    pub async fn cleanup(&mut self) -> TomeResult<()> {
        remove_dir_all_idempotent(&self.path).await?;
        self.removed = true;
        tracing::debug!(path = %self.path.display(), "Removed scratch directory");
        Ok(())
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to remove scratch directory"
            ),
        }
    }
}

/// `remove_dir_all` that treats a missing directory as success.
pub async fn remove_dir_all_idempotent(path: &Path) -> io::Result<()> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
