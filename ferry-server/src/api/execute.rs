//! Job API Handlers
//!
//! Both endpoints run one job per request and block until it finishes.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use ferry_core::dto::response::{InvocationEvent, JobResponse};

use crate::api::AppState;

/// POST /execute
/// Runs the job described by the body
///
/// The job's status code becomes the HTTP status and its body the HTTP body.
pub async fn execute(State(service): State<AppState>, body: Bytes) -> Response {
    tracing::debug!("Received /execute request ({} bytes)", body.len());

    let response = service.handle(&body).await;
    into_http(response)
}

/// POST /invoke
/// Runs the job carried in an event envelope `{"body": "<request json>"}`
///
/// Always answers 200 with the `{statusCode, body}` envelope as JSON.
pub async fn invoke(State(service): State<AppState>, body: Bytes) -> Json<JobResponse> {
    tracing::debug!("Received /invoke request ({} bytes)", body.len());

    let response = match serde_json::from_slice::<InvocationEvent>(&body) {
        Ok(event) => service.handle(event.body.as_bytes()).await,
        Err(e) => {
            tracing::warn!("Rejected invocation event: {}", e);
            JobResponse::bad_request(e)
        }
    };

    Json(response)
}

fn into_http(response: JobResponse) -> Response {
    let status =
        StatusCode::from_u16(response.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let content_type = if response.is_success() {
        "text/plain; charset=utf-8"
    } else {
        "application/json"
    };

    (status, [(header::CONTENT_TYPE, content_type)], response.body).into_response()
}
