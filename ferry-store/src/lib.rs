//! Ferry Object Store
//!
//! The object store client used to stage job inputs and publish job outputs.
//!
//! The [`ObjectStore`] trait is the seam between the pipeline and the storage
//! backend. Three implementations are provided:
//! - [`FsStore`]: buckets are directories under a local root
//! - [`HttpStore`]: S3-compatible path-style plain HTTP (`GET|PUT <endpoint>/<bucket>/<key>`)
//! - [`MemoryStore`]: an in-process map, for tests and embedding
//!
//! # Example
//!
//! ```no_run
//! use ferry_store::{FsStore, ObjectStore};
//!
//! #[tokio::main]
//! async fn main() -> ferry_store::Result<()> {
//!     let store = FsStore::new("/var/lib/ferry/store");
//!     store.put("b", "job1/in.txt", "hello".into(), "text/plain").await?;
//!     let body = store.get("b", "job1/in.txt").await?;
//!     assert_eq!(&body[..], b"hello");
//!     Ok(())
//! }
//! ```

pub mod error;
mod fs;
mod http;
mod memory;

pub use error::{Result, StoreError};
pub use fs::FsStore;
pub use http::HttpStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;
use std::sync::Arc;

/// Content type used for job files
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Object storage used by the pipeline
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch the full body of an object
    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes>;

    /// Store an object, replacing any existing one
    async fn put(&self, bucket: &str, key: &str, body: Bytes, content_type: &str) -> Result<()>;
}

/// Which backend to build
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    Fs { root: PathBuf },
    Http { endpoint: String },
    Memory,
}

impl StoreConfig {
    /// Reads the backend choice from the environment
    ///
    /// Expected environment variables:
    /// - FERRY_STORE (optional, `fs` | `http` | `memory`, default: fs)
    /// - FERRY_STORE_ROOT (optional, fs root, default: ./store)
    /// - FERRY_STORE_URL (required for http)
    pub fn from_env() -> Result<Self> {
        let kind = std::env::var("FERRY_STORE").unwrap_or_else(|_| "fs".to_string());
        match kind.as_str() {
            "fs" => Ok(Self::Fs {
                root: std::env::var("FERRY_STORE_ROOT")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("./store")),
            }),
            "http" => {
                let endpoint = std::env::var("FERRY_STORE_URL").map_err(|_| {
                    StoreError::Config("FERRY_STORE_URL environment variable not set".to_string())
                })?;
                Ok(Self::Http { endpoint })
            }
            "memory" => Ok(Self::Memory),
            other => Err(StoreError::Config(format!("unknown store kind '{}'", other))),
        }
    }

    /// Builds the configured store
    pub fn build(&self) -> Result<Arc<dyn ObjectStore>> {
        match self {
            Self::Fs { root } => Ok(Arc::new(FsStore::new(root.clone()))),
            Self::Http { endpoint } => {
                if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                    return Err(StoreError::Config(
                        "store url must start with http:// or https://".to_string(),
                    ));
                }
                Ok(Arc::new(HttpStore::new(endpoint.clone())))
            }
            Self::Memory => Ok(Arc::new(MemoryStore::new())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_rejects_bad_url() {
        let config = StoreConfig::Http {
            endpoint: "localhost:9000".to_string(),
        };
        assert!(matches!(config.build(), Err(StoreError::Config(_))));
    }

    #[tokio::test]
    async fn test_build_memory_store() {
        let store = StoreConfig::Memory.build().unwrap();
        store
            .put("b", "k", Bytes::from_static(b"v"), OCTET_STREAM)
            .await
            .unwrap();
        assert_eq!(store.get("b", "k").await.unwrap(), Bytes::from_static(b"v"));
    }
}
