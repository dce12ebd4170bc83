//! Trigger request DTO
//!
//! The JSON body delivered by the invocation trigger. It is converted into a
//! [`JobRequest`] with `TryFrom`, which performs all request validation.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::domain::job::{FileRef, JobRequest, is_bare_file_name};

/// Job description as received from the trigger
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerRequest {
    pub executable: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub inputs: Vec<FileRef>,
    #[serde(default)]
    pub outputs: Vec<FileRef>,
    pub options: TriggerOptions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_name: Option<String>,
}

/// Storage location and per-job policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerOptions {
    pub bucket: String,
    #[serde(default)]
    pub prefix: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continue_on_non_zero_exit: Option<bool>,
}

/// Reasons a trigger request is rejected before any stage runs
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("invalid JSON: {0}")]
    Malformed(String),

    #[error("executable must not be empty")]
    MissingExecutable,

    #[error("bucket must not be empty")]
    MissingBucket,

    #[error("'{0}' is not a plain file name")]
    InvalidFileName(String),

    #[error("duplicate {kind} file '{name}'")]
    DuplicateFile { kind: &'static str, name: String },
}

impl TriggerRequest {
    /// Parses and validates a raw JSON body
    pub fn parse_job(body: &[u8]) -> Result<JobRequest, RequestError> {
        let request: TriggerRequest =
            serde_json::from_slice(body).map_err(|e| RequestError::Malformed(e.to_string()))?;
        JobRequest::try_from(request)
    }
}

impl TryFrom<TriggerRequest> for JobRequest {
    type Error = RequestError;

    fn try_from(req: TriggerRequest) -> Result<Self, Self::Error> {
        if req.executable.is_empty() {
            return Err(RequestError::MissingExecutable);
        }
        if !is_bare_file_name(&req.executable) {
            return Err(RequestError::InvalidFileName(req.executable));
        }
        if req.options.bucket.is_empty() {
            return Err(RequestError::MissingBucket);
        }

        check_files("input", &req.inputs)?;
        check_files("output", &req.outputs)?;

        if let Some(log_name) = &req.log_name {
            if log_name.is_empty() {
                return Err(RequestError::InvalidFileName(log_name.clone()));
            }
        }

        Ok(JobRequest {
            executable: req.executable,
            args: req.args,
            inputs: req.inputs,
            outputs: req.outputs,
            bucket: req.options.bucket,
            prefix: req.options.prefix,
            log_name: req.log_name,
            continue_on_non_zero_exit: req.options.continue_on_non_zero_exit,
        })
    }
}

fn check_files(kind: &'static str, files: &[FileRef]) -> Result<(), RequestError> {
    let mut seen = HashSet::new();
    for file in files {
        if !is_bare_file_name(&file.name) {
            return Err(RequestError::InvalidFileName(file.name.clone()));
        }
        if !seen.insert(file.name.as_str()) {
            return Err(RequestError::DuplicateFile {
                kind,
                name: file.name.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADD_JOB: &str = r#"{
        "executable": "add.sh",
        "args": ["1", "2"],
        "inputs": [],
        "outputs": [{"name": "result.txt"}],
        "options": {"bucket": "b", "prefix": "job1"}
    }"#;

    #[test]
    fn test_parse_job() {
        let job = TriggerRequest::parse_job(ADD_JOB.as_bytes()).unwrap();
        assert_eq!(job.executable, "add.sh");
        assert_eq!(job.args, vec!["1", "2"]);
        assert!(job.inputs.is_empty());
        assert_eq!(job.outputs, vec![FileRef::new("result.txt")]);
        assert_eq!(job.bucket, "b");
        assert_eq!(job.prefix, "job1");
        assert_eq!(job.log_name, None);
        assert_eq!(job.continue_on_non_zero_exit, None);
    }

    #[test]
    fn test_parse_job_with_log_name_and_policy() {
        let body = r#"{
            "executable": "run",
            "options": {"bucket": "b", "prefix": "p", "continueOnNonZeroExit": false},
            "logName": "run.log"
        }"#;
        let job = TriggerRequest::parse_job(body.as_bytes()).unwrap();
        assert!(job.args.is_empty());
        assert_eq!(job.log_name.as_deref(), Some("run.log"));
        assert_eq!(job.continue_on_non_zero_exit, Some(false));
    }

    #[test]
    fn test_same_name_in_inputs_and_outputs() {
        let body = r#"{
            "executable": "sort",
            "inputs": [{"name": "data"}],
            "outputs": [{"name": "data"}],
            "options": {"bucket": "b", "prefix": "p"}
        }"#;
        assert!(TriggerRequest::parse_job(body.as_bytes()).is_ok());
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            TriggerRequest::parse_job(b"{not json"),
            Err(RequestError::Malformed(_))
        ));
        assert!(matches!(
            TriggerRequest::parse_job(br#"{"executable": "x"}"#),
            Err(RequestError::Malformed(_))
        ));
    }

    #[test]
    fn test_validation_errors() {
        let body = r#"{"executable": "", "options": {"bucket": "b"}}"#;
        assert_eq!(
            TriggerRequest::parse_job(body.as_bytes()),
            Err(RequestError::MissingExecutable)
        );

        let body = r#"{"executable": "x", "options": {"bucket": ""}}"#;
        assert_eq!(
            TriggerRequest::parse_job(body.as_bytes()),
            Err(RequestError::MissingBucket)
        );

        let body = r#"{"executable": "x", "inputs": [{"name": "../etc/passwd"}], "options": {"bucket": "b"}}"#;
        assert_eq!(
            TriggerRequest::parse_job(body.as_bytes()),
            Err(RequestError::InvalidFileName("../etc/passwd".to_string()))
        );

        let body = r#"{"executable": "x", "outputs": [{"name": "a"}, {"name": "a"}], "options": {"bucket": "b"}}"#;
        assert_eq!(
            TriggerRequest::parse_job(body.as_bytes()),
            Err(RequestError::DuplicateFile {
                kind: "output",
                name: "a".to_string()
            })
        );
    }
}
