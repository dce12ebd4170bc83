//! HTTP object store
//!
//! Talks to an S3-compatible endpoint using path-style addressing without
//! request signing: `GET <endpoint>/<bucket>/<key>` and
//! `PUT <endpoint>/<bucket>/<key>`. Authentication, if any, is left to the
//! endpoint (a gateway, a presigning proxy or a public bucket).

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode, header::CONTENT_TYPE};
use tracing::debug;

use crate::{ObjectStore, Result, StoreError};

#[derive(Debug, Clone)]
pub struct HttpStore {
    /// Base URL of the store (e.g., "http://localhost:9000")
    endpoint: String,
    client: Client,
}

impl HttpStore {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(endpoint, Client::new())
    }

    /// Create a store with a custom HTTP client (timeouts, proxies, TLS)
    pub fn with_client(endpoint: impl Into<String>, client: Client) -> Self {
        let endpoint = endpoint.into();
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn object_url(&self, bucket: &str, key: &str) -> String {
        format!("{}/{}/{}", self.endpoint, bucket, key.trim_start_matches('/'))
    }

    async fn check_status(
        response: reqwest::Response,
        bucket: &str,
        key: &str,
    ) -> Result<reqwest::Response> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(StoreError::not_found(bucket, key));
        }
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(StoreError::Status {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl ObjectStore for HttpStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes> {
        let url = self.object_url(bucket, key);
        debug!("GET {}", url);

        let response = self.client.get(&url).send().await?;
        let response = Self::check_status(response, bucket, key).await?;
        Ok(response.bytes().await?)
    }

    async fn put(&self, bucket: &str, key: &str, body: Bytes, content_type: &str) -> Result<()> {
        let url = self.object_url(bucket, key);
        debug!("PUT {} ({} bytes)", url, body.len());

        let response = self
            .client
            .put(&url)
            .header(CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await?;
        Self::check_status(response, bucket, key).await?;
        Ok(())
    }
}
