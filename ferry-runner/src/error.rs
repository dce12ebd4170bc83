//! Pipeline error taxonomy
//!
//! Each stage folds the failures of its own fan-out into one error before
//! handing it to the orchestrator. The orchestrator only looks at which
//! stage failed to pick the response status.

use ferry_core::dto::job::RequestError;
use ferry_core::dto::response::{JobResponse, STATUS_BAD_REQUEST, STATUS_SERVER_ERROR};
use ferry_lua::ScriptError;
use ferry_store::StoreError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinError;

/// The scratch directory could not be created or emptied
#[derive(Debug, Error)]
#[error("failed to clear scratch directory {}: {source}", path.display())]
pub struct ScratchClearError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("failed to download '{file}': {source}")]
    Fetch {
        file: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to save '{file}': {source}")]
    Write {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error("download task failed: {0}")]
    Interrupted(#[from] JoinError),
}

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("failed to launch '{executable}': {source}")]
    Launch {
        executable: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{executable}' failed: {source}")]
    Script {
        executable: String,
        #[source]
        source: ScriptError,
    },

    #[error("'{executable}' exited with {}", describe_exit(*code))]
    NonZeroExit {
        executable: String,
        code: Option<i32>,
    },

    #[error("'{executable}' timed out after {timeout:?}")]
    TimedOut {
        executable: String,
        timeout: Duration,
    },
}

fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("code {}", code),
        None => "a signal".to_string(),
    }
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("failed to read output '{file}': {source}")]
    Read {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to upload '{file}': {source}")]
    Store {
        file: String,
        #[source]
        source: StoreError,
    },

    #[error("upload task failed: {0}")]
    Interrupted(#[from] JoinError),
}

/// Why a job failed
#[derive(Debug, Error)]
pub enum JobError {
    #[error("{0}")]
    InvalidRequest(#[from] RequestError),

    #[error(transparent)]
    ScratchClear(#[from] ScratchClearError),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("failed to persist metrics log '{key}': {source}")]
    LogPersist {
        key: String,
        #[source]
        source: StoreError,
    },
}

impl JobError {
    /// Pipeline stage the error belongs to
    pub fn stage(&self) -> &'static str {
        match self {
            JobError::InvalidRequest(_) => "request",
            JobError::ScratchClear(_) => "clear",
            JobError::Download(_) => "download",
            JobError::Execution(_) => "execute",
            JobError::Upload(_) => "upload",
            JobError::LogPersist { .. } => "done",
        }
    }

    /// Response status for this failure
    ///
    /// Download failures are reported as server errors so that the caller
    /// retries the job; everything else is a client error.
    pub fn status_code(&self) -> u16 {
        match self {
            JobError::Download(_) => STATUS_SERVER_ERROR,
            _ => STATUS_BAD_REQUEST,
        }
    }

    pub fn to_response(&self) -> JobResponse {
        match self {
            JobError::Download(_) => JobResponse::download_error(),
            other => JobResponse::bad_request(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn io_error() -> std::io::Error {
        std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied")
    }

    #[test]
    fn test_download_failure_is_server_error() {
        let err = JobError::from(DownloadError::Fetch {
            file: "in.txt".to_string(),
            source: StoreError::not_found("b", "job1/in.txt"),
        });

        assert_eq!(err.status_code(), 500);
        assert_eq!(err.stage(), "download");

        let response = err.to_response();
        assert_eq!(response.status_code, 500);
        assert_eq!(response.error_message().as_deref(), Some("S3 download error"));
    }

    #[test]
    fn test_other_failures_are_bad_requests() {
        let errors = [
            JobError::from(ScratchClearError {
                path: PathBuf::from("/tmp/ferry/x"),
                source: io_error(),
            }),
            JobError::from(ExecutionError::NonZeroExit {
                executable: "add.sh".to_string(),
                code: Some(2),
            }),
            JobError::from(UploadError::Read {
                file: "out.txt".to_string(),
                source: io_error(),
            }),
            JobError::from(RequestError::MissingBucket),
        ];

        for err in errors {
            assert_eq!(err.status_code(), 400);
            let message = err.to_response().error_message().unwrap();
            assert!(message.starts_with("Bad Request: "), "{message}");
            assert!(message.ends_with(&err.to_string()), "{message}");
        }
    }

    #[test]
    fn test_execution_error_messages() {
        let err = ExecutionError::NonZeroExit {
            executable: "run".to_string(),
            code: None,
        };
        assert_eq!(err.to_string(), "'run' exited with a signal");

        let err = ExecutionError::TimedOut {
            executable: "run".to_string(),
            timeout: Duration::from_secs(30),
        };
        assert_eq!(err.to_string(), "'run' timed out after 30s");

        let err = ExecutionError::TimedOut {
            executable: "run".to_string(),
            timeout: Duration::from_millis(200),
        };
        assert_eq!(err.to_string(), "'run' timed out after 200ms");
    }
}
