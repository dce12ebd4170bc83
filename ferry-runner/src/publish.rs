//! UPLOAD stage

use bytes::Bytes;
use ferry_core::domain::job::{FileRef, object_key};
use ferry_store::{OCTET_STREAM, ObjectStore};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::error::UploadError;
use crate::scratch::ScratchSpace;
use crate::transfer::for_each_bounded;

/// Uploads job outputs from a scratch directory
#[derive(Clone)]
pub struct Publisher {
    store: Arc<dyn ObjectStore>,
    permits: Arc<Semaphore>,
}

impl Publisher {
    pub fn new(store: Arc<dyn ObjectStore>, permits: Arc<Semaphore>) -> Self {
        Self { store, permits }
    }

    /// Uploads `<scratch>/<name>` to `<bucket>/<prefix>/<name>` for every output
    ///
    /// A declared output the executable did not produce fails the stage.
    pub async fn publish(
        &self,
        files: &[FileRef],
        bucket: &str,
        prefix: &str,
        scratch: &ScratchSpace,
    ) -> Result<(), UploadError> {
        info!("Uploading {} file(s) to bucket '{}'", files.len(), bucket);

        let names = files.iter().map(|f| f.name.clone()).collect();
        let bucket: Arc<str> = Arc::from(bucket);

        for_each_bounded(names, &self.permits, |name| {
            let store = Arc::clone(&self.store);
            let bucket = Arc::clone(&bucket);
            let key = object_key(prefix, &name);
            let source_path = scratch.file(&name);

            async move {
                let body = tokio::fs::read(&source_path)
                    .await
                    .map_err(|source| UploadError::Read {
                        file: name.clone(),
                        source,
                    })?;
                let size = body.len();

                store
                    .put(&bucket, &key, Bytes::from(body), OCTET_STREAM)
                    .await
                    .map_err(|source| UploadError::Store {
                        file: name.clone(),
                        source,
                    })?;

                debug!("Uploaded {}/{} ({} bytes)", bucket, key, size);
                Ok(())
            }
        })
        .await
    }
}
