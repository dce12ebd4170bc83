//! API client module
//!
//! HTTP client for submitting jobs to a Ferry server.

use anyhow::{Context, Result};
use ferry_core::dto::response::JobResponse;
use reqwest::Client;

/// HTTP client for the Ferry server API
pub struct ApiClient {
    base_url: String,
    client: Client,
}

impl ApiClient {
    /// Create a new API client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the server
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    /// Submit a raw job request to `/execute`
    ///
    /// Any HTTP status is a job outcome here; only transport failures are errors.
    pub async fn execute(&self, body: Vec<u8>) -> Result<JobResponse> {
        let url = format!("{}/execute", self.base_url);
        let response = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .context("Failed to send execute request")?;

        let status_code = response.status().as_u16();
        let body = response
            .text()
            .await
            .context("Failed to read execute response")?;

        Ok(JobResponse { status_code, body })
    }
}
