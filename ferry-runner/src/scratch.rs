//! Scratch space management
//!
//! Every job works in its own directory `<scratch_root>/<job-id>`. The
//! directory is emptied before staging (CLEAR) so nothing from an earlier
//! run can be executed or uploaded by this one.

use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::ScratchClearError;

#[derive(Debug, Clone)]
pub struct ScratchSpace {
    path: PathBuf,
}

impl ScratchSpace {
    /// Wraps an existing directory
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates the directory for `job_id` under `root`
    pub async fn create(root: &Path, job_id: Uuid) -> Result<Self, ScratchClearError> {
        let path = root.join(job_id.to_string());
        tokio::fs::create_dir_all(&path)
            .await
            .map_err(|source| ScratchClearError {
                path: path.clone(),
                source,
            })?;
        debug!("Created scratch directory {}", path.display());
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of a job file inside the scratch directory
    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    /// Deletes every entry in the directory
    ///
    /// Stops at the first entry that cannot be removed.
    pub async fn clear(&self) -> Result<(), ScratchClearError> {
        let fail = |path: &Path, source: io::Error| ScratchClearError {
            path: path.to_path_buf(),
            source,
        };

        let mut entries = tokio::fs::read_dir(&self.path)
            .await
            .map_err(|e| fail(&self.path, e))?;

        let mut removed = 0usize;
        while let Some(entry) = entries.next_entry().await.map_err(|e| fail(&self.path, e))? {
            let path = entry.path();
            let file_type = entry.file_type().await.map_err(|e| fail(&path, e))?;

            let result = if file_type.is_dir() {
                tokio::fs::remove_dir_all(&path).await
            } else {
                tokio::fs::remove_file(&path).await
            };
            result.map_err(|e| fail(&path, e))?;
            removed += 1;
        }

        debug!(
            "Cleared scratch directory {} ({} entries removed)",
            self.path.display(),
            removed
        );
        Ok(())
    }

    /// Lists entry names, sorted
    pub async fn entries(&self) -> io::Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.path).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    /// Hands the directory's lifetime to a [`ScratchGuard`]
    pub fn guard(self, keep: bool) -> ScratchGuard {
        ScratchGuard {
            scratch: self,
            keep,
            armed: true,
        }
    }
}

/// Owns a job's scratch directory until the job ends
///
/// [`release`](Self::release) removes it at the end of a job. If the job is
/// dropped before that (the caller went away mid-run), the directory is
/// removed on drop instead. With `keep` set the directory is always left in
/// place.
#[derive(Debug)]
pub struct ScratchGuard {
    scratch: ScratchSpace,
    keep: bool,
    armed: bool,
}

impl ScratchGuard {
    pub fn space(&self) -> &ScratchSpace {
        &self.scratch
    }

    pub async fn release(mut self) {
        self.armed = false;

        let path = self.scratch.path();
        if self.keep {
            debug!("Keeping scratch directory {}", path.display());
        } else if let Err(e) = tokio::fs::remove_dir_all(path).await {
            warn!("Failed to remove scratch directory {}: {}", path.display(), e);
        }
    }
}

impl Drop for ScratchGuard {
    fn drop(&mut self) {
        if !self.armed || self.keep {
            return;
        }

        let path = self.scratch.path();
        match std::fs::remove_dir_all(path) {
            Ok(()) => debug!("Removed scratch directory {} of abandoned job", path.display()),
            Err(e) => warn!("Failed to remove scratch directory {}: {}", path.display(), e),
        }
    }
}
