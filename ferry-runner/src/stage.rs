//! DOWNLOAD stage
//!
//! Fetches the job's inputs (and the executable, unless it ships in the
//! bundle directory) from the object store into the scratch directory.

use ferry_core::domain::job::{FileRef, object_key};
use ferry_store::ObjectStore;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::error::DownloadError;
use crate::scratch::ScratchSpace;
use crate::transfer::for_each_bounded;

/// Downloads job files into a scratch directory
#[derive(Clone)]
pub struct Stager {
    store: Arc<dyn ObjectStore>,
    permits: Arc<Semaphore>,
}

impl Stager {
    pub fn new(store: Arc<dyn ObjectStore>, permits: Arc<Semaphore>) -> Self {
        Self { store, permits }
    }

    /// Names to download for a job
    ///
    /// The inputs, plus the executable when `bundle_dir` has no file of that
    /// name. Duplicates are removed, keeping first-seen order.
    pub async fn download_set(
        inputs: &[FileRef],
        executable: &str,
        bundle_dir: &Path,
    ) -> Vec<String> {
        let mut names: Vec<String> = Vec::with_capacity(inputs.len() + 1);
        for input in inputs {
            if !names.contains(&input.name) {
                names.push(input.name.clone());
            }
        }

        let bundled = tokio::fs::metadata(bundle_dir.join(executable))
            .await
            .is_ok_and(|m| m.is_file());
        if !bundled && !names.iter().any(|n| n == executable) {
            names.push(executable.to_string());
        }

        names
    }

    /// Downloads every file in `files` from `bucket` under `prefix`
    ///
    /// Each object lands at `<scratch>/<name>`. Fails on the first object
    /// that cannot be fetched or written.
    pub async fn stage(
        &self,
        files: Vec<String>,
        bucket: &str,
        prefix: &str,
        scratch: &ScratchSpace,
    ) -> Result<(), DownloadError> {
        info!("Downloading {} file(s) from bucket '{}'", files.len(), bucket);

        let bucket: Arc<str> = Arc::from(bucket);
        let prefix: Arc<str> = Arc::from(prefix);

        for_each_bounded(files, &self.permits, |name| {
            let store = Arc::clone(&self.store);
            let bucket = Arc::clone(&bucket);
            let key = object_key(&prefix, &name);
            let dest = scratch.file(&name);

            async move {
                let body = store
                    .get(&bucket, &key)
                    .await
                    .map_err(|source| DownloadError::Fetch {
                        file: name.clone(),
                        source,
                    })?;

                tokio::fs::write(&dest, &body)
                    .await
                    .map_err(|source| DownloadError::Write {
                        file: name.clone(),
                        source,
                    })?;

                debug!("Downloaded {}/{} ({} bytes)", bucket, key, body.len());
                Ok(())
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_store::MemoryStore;

    fn files(names: &[&str]) -> Vec<FileRef> {
        names.iter().map(|n| FileRef::new(*n)).collect()
    }

    fn stager(store: &MemoryStore) -> Stager {
        Stager::new(Arc::new(store.clone()), Arc::new(Semaphore::new(2)))
    }

    #[tokio::test]
    async fn test_download_set_includes_missing_executable() {
        let bundle = tempfile::tempdir().unwrap();

        let set = Stager::download_set(&files(&["a.txt", "b.txt"]), "add.sh", bundle.path()).await;

        assert_eq!(set, vec!["a.txt", "b.txt", "add.sh"]);
    }

    #[tokio::test]
    async fn test_download_set_skips_bundled_executable() {
        let bundle = tempfile::tempdir().unwrap();
        std::fs::write(bundle.path().join("add.sh"), "#!/bin/sh\n").unwrap();

        let set = Stager::download_set(&files(&["a.txt"]), "add.sh", bundle.path()).await;

        assert_eq!(set, vec!["a.txt"]);
    }

    #[tokio::test]
    async fn test_download_set_deduplicates() {
        let bundle = tempfile::tempdir().unwrap();

        let set =
            Stager::download_set(&files(&["add.sh", "a.txt", "a.txt"]), "add.sh", bundle.path())
                .await;

        assert_eq!(set, vec!["add.sh", "a.txt"]);
    }

    #[tokio::test]
    async fn test_download_set_ignores_bundled_directory() {
        let bundle = tempfile::tempdir().unwrap();
        std::fs::create_dir(bundle.path().join("add.sh")).unwrap();

        let set = Stager::download_set(&[], "add.sh", bundle.path()).await;

        assert_eq!(set, vec!["add.sh"]);
    }

    #[tokio::test]
    async fn test_stage_writes_files() {
        let store = MemoryStore::new();
        store.insert("b", "job1/a.txt", "1");
        store.insert("b", "job1/b.txt", "2");
        let dir = tempfile::tempdir().unwrap();
        let scratch = ScratchSpace::new(dir.path());

        stager(&store)
            .stage(
                vec!["a.txt".to_string(), "b.txt".to_string()],
                "b",
                "job1",
                &scratch,
            )
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(scratch.file("a.txt")).unwrap(), "1");
        assert_eq!(std::fs::read_to_string(scratch.file("b.txt")).unwrap(), "2");
    }

    #[tokio::test]
    async fn test_stage_missing_object_fails() {
        let store = MemoryStore::new();
        store.insert("b", "job1/a.txt", "1");
        let dir = tempfile::tempdir().unwrap();
        let scratch = ScratchSpace::new(dir.path());

        let err = stager(&store)
            .stage(
                vec!["a.txt".to_string(), "missing.txt".to_string()],
                "b",
                "job1",
                &scratch,
            )
            .await
            .unwrap_err();

        match err {
            DownloadError::Fetch { file, source } => {
                assert_eq!(file, "missing.txt");
                assert!(source.is_not_found());
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_stage_empty_prefix_uses_bare_key() {
        let store = MemoryStore::new();
        store.insert("b", "a.txt", "top");
        let dir = tempfile::tempdir().unwrap();
        let scratch = ScratchSpace::new(dir.path());

        stager(&store)
            .stage(vec!["a.txt".to_string()], "b", "", &scratch)
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(scratch.file("a.txt")).unwrap(), "top");
    }
}
