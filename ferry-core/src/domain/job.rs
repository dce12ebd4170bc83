//! Job domain types

use serde::{Deserialize, Serialize};

/// Store key prefix under which metrics logs are written
pub const LOGS_PREFIX: &str = "logs";

/// A named file exchanged between the object store and the scratch directory
///
/// The name is both the local filename and the key suffix (`prefix/name`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileRef {
    pub name: String,
}

impl FileRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A validated job request
///
/// Built from a `TriggerRequest` and immutable for the rest of the invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    pub executable: String,
    pub args: Vec<String>,
    pub inputs: Vec<FileRef>,
    pub outputs: Vec<FileRef>,
    pub bucket: String,
    pub prefix: String,
    pub log_name: Option<String>,
    /// Per-job override of the runner's non-zero exit policy
    pub continue_on_non_zero_exit: Option<bool>,
}

impl JobRequest {
    /// Store key of the metrics log, if one was requested
    pub fn log_key(&self) -> Option<String> {
        self.log_name
            .as_ref()
            .map(|name| format!("{}/{}", LOGS_PREFIX, name))
    }
}

/// Joins a prefix and a file name into a store key
///
/// An empty prefix yields the bare name.
pub fn object_key(prefix: &str, name: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    }
}

/// Returns true if `name` can be used as a scratch filename as-is
///
/// Rejects anything that could escape the scratch directory.
pub fn is_bare_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(prefix: &str, log_name: Option<&str>) -> JobRequest {
        JobRequest {
            executable: "add.sh".to_string(),
            args: vec![],
            inputs: vec![],
            outputs: vec![],
            bucket: "b".to_string(),
            prefix: prefix.to_string(),
            log_name: log_name.map(str::to_string),
            continue_on_non_zero_exit: None,
        }
    }

    #[test]
    fn test_object_key_joins_prefix() {
        assert_eq!(object_key("job1", "a.txt"), "job1/a.txt");
        assert_eq!(object_key("job1/", "a.txt"), "job1/a.txt");
    }

    #[test]
    fn test_object_key_empty_prefix() {
        assert_eq!(object_key("", "a.txt"), "a.txt");
    }

    #[test]
    fn test_log_key() {
        assert_eq!(
            request("job1", Some("run-7")).log_key(),
            Some("logs/run-7".to_string())
        );
        assert_eq!(request("job1", None).log_key(), None);
    }

    #[test]
    fn test_bare_file_names() {
        assert!(is_bare_file_name("result.txt"));
        assert!(is_bare_file_name(".hidden"));
        assert!(!is_bare_file_name(""));
        assert!(!is_bare_file_name(".."));
        assert!(!is_bare_file_name("dir/file"));
        assert!(!is_bare_file_name("..\\file"));
    }
}
