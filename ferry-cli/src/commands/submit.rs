//! Remote job submission

use anyhow::Result;
use ferry_core::dto::response::JobResponse;
use std::path::Path;

use crate::api::ApiClient;

/// Posts the job in `request` to the server at `url`
pub(super) async fn submit_job(request: &Path, url: &str) -> Result<JobResponse> {
    let body = super::read_request(request)?;
    let client = ApiClient::new(url);
    client.execute(body).await
}
