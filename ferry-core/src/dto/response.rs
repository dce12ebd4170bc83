//! Response envelope DTO
//!
//! Exactly one `JobResponse` is produced per invocation. The body is always a
//! string: the metrics text on success, a JSON `{"message": ...}` document on
//! failure.

use serde::{Deserialize, Serialize};
use std::fmt::Display;

pub const STATUS_OK: u16 = 200;
pub const STATUS_BAD_REQUEST: u16 = 400;
pub const STATUS_SERVER_ERROR: u16 = 500;

/// Message returned for every download failure
pub const DOWNLOAD_ERROR_MESSAGE: &str = "S3 download error";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResponse {
    pub status_code: u16,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

impl JobResponse {
    pub fn success(metrics: impl Into<String>) -> Self {
        Self {
            status_code: STATUS_OK,
            body: metrics.into(),
        }
    }

    /// Client-side failure: `{"message": "Bad Request: <error>"}`
    pub fn bad_request(error: impl Display) -> Self {
        Self::with_message(STATUS_BAD_REQUEST, format!("Bad Request: {}", error))
    }

    /// Storage download failure, reported as a server error so callers retry
    pub fn download_error() -> Self {
        Self::with_message(STATUS_SERVER_ERROR, DOWNLOAD_ERROR_MESSAGE.to_string())
    }

    fn with_message(status_code: u16, message: String) -> Self {
        let body = serde_json::to_string(&ErrorBody { message })
            .unwrap_or_else(|_| r#"{"message":"internal error"}"#.to_string());
        Self { status_code, body }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == STATUS_OK
    }

    /// Decodes the error message of a failure response
    pub fn error_message(&self) -> Option<String> {
        if self.is_success() {
            return None;
        }
        serde_json::from_str::<ErrorBody>(&self.body)
            .ok()
            .map(|b| b.message)
    }
}

/// Serverless-style event envelope carrying the trigger request as a string
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationEvent {
    pub body: String,
}
