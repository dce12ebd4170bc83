//! EXECUTE stage
//!
//! Launches the job executable in the scratch directory and waits for it.
//! Scripts with the `.lua` extension run on the embedded Lua runtime
//! instead of being spawned. Output is forwarded to tracing line by line,
//! tagged with the executable name.

use ferry_lua::{LogLevel, LogSink, SCRIPT_EXTENSION, run_script};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use crate::error::ExecutionError;

/// How the executable finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitReport {
    pub executable: String,
    /// None when the process was terminated by a signal
    pub code: Option<i32>,
}

impl ExitReport {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs job executables
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    bundle_dir: PathBuf,
    timeout: Option<Duration>,
}

impl ProcessRunner {
    pub fn new(bundle_dir: impl Into<PathBuf>, timeout: Option<Duration>) -> Self {
        Self {
            bundle_dir: bundle_dir.into(),
            timeout,
        }
    }

    /// Locates the executable
    ///
    /// A copy staged into `workdir` wins and is made executable. Otherwise
    /// the bundled file is used. The returned path is absolute.
    pub async fn resolve(&self, executable: &str, workdir: &Path) -> Result<PathBuf, ExecutionError> {
        let launch_error = |source| ExecutionError::Launch {
            executable: executable.to_string(),
            source,
        };

        let staged = workdir.join(executable);
        let path = if tokio::fs::metadata(&staged).await.is_ok_and(|m| m.is_file()) {
            make_executable(&staged).await.map_err(launch_error)?;
            staged
        } else {
            self.bundle_dir.join(executable)
        };

        std::path::absolute(&path).map_err(launch_error)
    }

    /// Runs `executable` with `args` in `workdir` and waits for it to exit
    ///
    /// A non-zero exit is reported in the [`ExitReport`], not as an error;
    /// the caller decides whether it is fatal.
    pub async fn run(
        &self,
        executable: &str,
        args: &[String],
        workdir: &Path,
    ) -> Result<ExitReport, ExecutionError> {
        let path = self.resolve(executable, workdir).await?;
        debug!("Resolved executable '{}' to {}", executable, path.display());

        if is_script(executable) {
            self.run_script(executable, path, args, workdir).await
        } else {
            self.run_process(executable, &path, args, workdir).await
        }
    }

    async fn run_process(
        &self,
        executable: &str,
        path: &Path,
        args: &[String],
        workdir: &Path,
    ) -> Result<ExitReport, ExecutionError> {
        let launch_error = |source| ExecutionError::Launch {
            executable: executable.to_string(),
            source,
        };

        let mut child = Command::new(path)
            .args(args)
            .current_dir(workdir)
            .env("PATH", search_path(&self.bundle_dir).map_err(launch_error)?)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(launch_error)?;

        info!("Started '{}' (pid {:?})", executable, child.id());

        let stdout = child
            .stdout
            .take()
            .map(|out| tokio::spawn(forward_lines(out, executable.to_string(), LogLevel::Info)));
        let stderr = child
            .stderr
            .take()
            .map(|err| tokio::spawn(forward_lines(err, executable.to_string(), LogLevel::Warning)));

        let status = match self.timeout {
            Some(limit) => {
                let waited = tokio::time::timeout(limit, child.wait()).await;
                let Ok(status) = waited else {
                    warn!("'{}' exceeded {:?}, killing it", executable, limit);
                    if let Err(e) = child.kill().await {
                        error!("Failed to kill '{}': {}", executable, e);
                    }
                    for task in [stdout, stderr].into_iter().flatten() {
                        task.abort();
                    }
                    return Err(ExecutionError::TimedOut {
                        executable: executable.to_string(),
                        timeout: limit,
                    });
                };
                status
            }
            None => child.wait().await,
        }
        .map_err(launch_error)?;

        // Drain both streams so no output is lost
        for task in [stdout, stderr].into_iter().flatten() {
            if let Err(e) = task.await {
                warn!("Output forwarding for '{}' failed: {}", executable, e);
            }
        }

        let report = ExitReport {
            executable: executable.to_string(),
            code: status.code(),
        };
        info!("'{}' exited with {:?}", executable, report.code);
        Ok(report)
    }

    async fn run_script(
        &self,
        executable: &str,
        path: PathBuf,
        args: &[String],
        workdir: &Path,
    ) -> Result<ExitReport, ExecutionError> {
        let sink = TracingSink {
            executable: executable.to_string(),
        };
        let args = args.to_vec();
        let workdir = workdir.to_path_buf();

        info!("Running script '{}'", executable);
        let cancel = CancelOnDrop::default();
        let flag = Arc::clone(&cancel.0);
        let mut handle =
            tokio::task::spawn_blocking(move || run_script(&path, &args, &workdir, sink, flag));

        let joined = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    warn!("'{}' exceeded {:?}, cancelling it", executable, limit);
                    cancel.trigger();
                    if let Err(e) = handle.await {
                        error!("Script thread for '{}' failed: {}", executable, e);
                    }
                    return Err(ExecutionError::TimedOut {
                        executable: executable.to_string(),
                        timeout: limit,
                    });
                }
            },
            None => handle.await,
        };

        let result = joined.map_err(|e| ExecutionError::Launch {
            executable: executable.to_string(),
            source: std::io::Error::other(e.to_string()),
        })?;

        let code = result
            .map_err(|source| ExecutionError::Script {
                executable: executable.to_string(),
                source,
            })?
            .code;

        info!("'{}' exited with {}", executable, code);
        Ok(ExitReport {
            executable: executable.to_string(),
            code: Some(code),
        })
    }
}

fn is_script(executable: &str) -> bool {
    Path::new(executable)
        .extension()
        .is_some_and(|ext| ext == SCRIPT_EXTENSION)
}

/// `.:<bundle_dir>:<inherited PATH>`
fn search_path(bundle_dir: &Path) -> std::io::Result<OsString> {
    let mut dirs = vec![PathBuf::from("."), bundle_dir.to_path_buf()];
    if let Some(inherited) = std::env::var_os("PATH") {
        dirs.extend(std::env::split_paths(&inherited));
    }
    std::env::join_paths(dirs).map_err(std::io::Error::other)
}

#[cfg(unix)]
async fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o777)).await
}

#[cfg(not(unix))]
async fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

async fn forward_lines<R: AsyncRead + Unpin>(reader: R, executable: String, level: LogLevel) {
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => log_line(&executable, level, &line),
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to read output of '{}': {}", executable, e);
                break;
            }
        }
    }
}

fn log_line(executable: &str, level: LogLevel, line: &str) {
    match level {
        LogLevel::Debug => debug!(executable, "{}", line),
        LogLevel::Info => info!(executable, "{}", line),
        LogLevel::Warning => warn!(executable, "{}", line),
        LogLevel::Error => error!(executable, "{}", line),
    }
}

/// Stops the script when the job stops waiting for it
#[derive(Default)]
struct CancelOnDrop(Arc<AtomicBool>);

impl CancelOnDrop {
    fn trigger(&self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.trigger();
    }
}

/// Routes Lua `log.*` and `print` output to tracing
struct TracingSink {
    executable: String,
}

impl LogSink for TracingSink {
    fn write(&mut self, level: LogLevel, message: &str) {
        log_line(&self.executable, level, message);
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn write_file(dir: &Path, name: &str, content: &str) {
        std::fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_is_script() {
        assert!(is_script("add.lua"));
        assert!(!is_script("add.sh"));
        assert!(!is_script("lua"));
    }

    #[test]
    fn test_search_path_order() {
        let path = search_path(Path::new("/opt/bundle")).unwrap();
        let dirs: Vec<PathBuf> = std::env::split_paths(&path).collect();
        assert_eq!(dirs[0], PathBuf::from("."));
        assert_eq!(dirs[1], PathBuf::from("/opt/bundle"));
    }

    #[tokio::test]
    async fn test_resolve_prefers_staged_copy() {
        use std::os::unix::fs::PermissionsExt;

        let bundle = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        write_file(bundle.path(), "run.sh", "#!/bin/sh\n");
        write_file(work.path(), "run.sh", "#!/bin/sh\n");

        let runner = ProcessRunner::new(bundle.path(), None);
        let path = runner.resolve("run.sh", work.path()).await.unwrap();

        assert_eq!(path, work.path().join("run.sh"));
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o777);
    }

    #[tokio::test]
    async fn test_resolve_falls_back_to_bundle() {
        let bundle = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();

        let runner = ProcessRunner::new(bundle.path(), None);
        let path = runner.resolve("run.sh", work.path()).await.unwrap();

        assert_eq!(path, bundle.path().join("run.sh"));
    }

    #[tokio::test]
    async fn test_run_process_in_workdir() {
        let bundle = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        write_file(
            work.path(),
            "add.sh",
            "#!/bin/sh\necho adding\necho $(($1 + $2)) > result.txt\n",
        );

        let runner = ProcessRunner::new(bundle.path(), None);
        let report = runner
            .run("add.sh", &["1".to_string(), "2".to_string()], work.path())
            .await
            .unwrap();

        assert!(report.success());
        assert_eq!(
            std::fs::read_to_string(work.path().join("result.txt")).unwrap().trim(),
            "3"
        );
    }

    #[tokio::test]
    async fn test_run_reports_non_zero_exit() {
        let bundle = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        write_file(bundle.path(), "fail.sh", "#!/bin/sh\necho nope >&2\nexit 3\n");
        std::fs::set_permissions(
            bundle.path().join("fail.sh"),
            <std::fs::Permissions as std::os::unix::fs::PermissionsExt>::from_mode(0o755),
        )
        .unwrap();

        let runner = ProcessRunner::new(bundle.path(), None);
        let report = runner.run("fail.sh", &[], work.path()).await.unwrap();

        assert_eq!(report.code, Some(3));
        assert!(!report.success());
    }

    #[tokio::test]
    async fn test_run_missing_executable_is_launch_error() {
        let bundle = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();

        let runner = ProcessRunner::new(bundle.path(), None);
        let err = runner.run("nothing.sh", &[], work.path()).await.unwrap_err();

        assert!(matches!(err, ExecutionError::Launch { .. }));
    }

    #[tokio::test]
    async fn test_run_times_out() {
        let bundle = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        write_file(work.path(), "slow.sh", "#!/bin/sh\nsleep 5\n");

        let runner = ProcessRunner::new(bundle.path(), Some(Duration::from_millis(200)));
        let err = runner.run("slow.sh", &[], work.path()).await.unwrap_err();

        assert!(matches!(err, ExecutionError::TimedOut { .. }));
    }

    #[tokio::test]
    async fn test_run_lua_script() {
        let bundle = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        write_file(
            work.path(),
            "add.lua",
            r#"
            local a, b = ...
            fs.write("result.txt", tostring(tonumber(a) + tonumber(b)))
            "#,
        );

        let runner = ProcessRunner::new(bundle.path(), None);
        let report = runner
            .run("add.lua", &["1".to_string(), "2".to_string()], work.path())
            .await
            .unwrap();

        assert!(report.success());
        assert_eq!(
            std::fs::read_to_string(work.path().join("result.txt")).unwrap(),
            "3"
        );
    }

    #[tokio::test]
    async fn test_lua_runtime_error_is_script_error() {
        let bundle = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        write_file(work.path(), "boom.lua", r#"error("boom")"#);

        let runner = ProcessRunner::new(bundle.path(), None);
        let err = runner.run("boom.lua", &[], work.path()).await.unwrap_err();

        assert!(matches!(err, ExecutionError::Script { .. }));
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn test_lua_return_value_is_exit_code() {
        let bundle = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        write_file(work.path(), "three.lua", "return 3");

        let runner = ProcessRunner::new(bundle.path(), None);
        let report = runner.run("three.lua", &[], work.path()).await.unwrap();

        assert_eq!(report.code, Some(3));
    }

    #[tokio::test]
    async fn test_lua_timeout_stops_script() {
        let bundle = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        write_file(
            work.path(),
            "spin.lua",
            r#"
            local i = 0
            while true do
                i = i + 1
                if i % 100000 == 0 then
                    fs.write("tick", tostring(i))
                end
            end
            "#,
        );

        let runner = ProcessRunner::new(bundle.path(), Some(Duration::from_millis(200)));
        let err = runner.run("spin.lua", &[], work.path()).await.unwrap_err();
        assert!(matches!(err, ExecutionError::TimedOut { .. }));

        let tick = work.path().join("tick");
        let before = std::fs::read_to_string(&tick).unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(std::fs::read_to_string(&tick).unwrap(), before);
    }
}
