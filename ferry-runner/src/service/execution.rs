//! Execution service
//!
//! Runs one job per call through the pipeline:
//! - CLEAR: create and empty the job's scratch directory
//! - DOWNLOAD: stage inputs (and the executable, if not bundled)
//! - EXECUTE: run the executable, applying the non-zero exit policy
//! - UPLOAD: publish the declared outputs
//! - DONE: finalize metrics and persist them when a log name was given
//!
//! The first failing stage ends the job; nothing after it runs.

use async_trait::async_trait;
use bytes::Bytes;
use ferry_core::domain::job::JobRequest;
use ferry_core::domain::metrics::{Metrics, Stage};
use ferry_core::dto::job::TriggerRequest;
use ferry_core::dto::response::JobResponse;
use ferry_store::ObjectStore;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::config::RunnerConfig;
use crate::error::{ExecutionError, JobError};
use crate::process::ProcessRunner;
use crate::publish::Publisher;
use crate::scratch::ScratchSpace;
use crate::stage::Stager;

/// Content type of persisted metrics logs
const LOG_CONTENT_TYPE: &str = "text/plain";

/// Terminal result of one job
#[derive(Debug)]
pub enum JobOutcome {
    Success { metrics: Metrics },
    Failure { error: JobError, metrics: Metrics },
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Success { .. })
    }

    pub fn metrics(&self) -> &Metrics {
        match self {
            JobOutcome::Success { metrics } | JobOutcome::Failure { metrics, .. } => metrics,
        }
    }

    /// Maps the outcome to the response returned to the caller
    pub fn into_response(self) -> JobResponse {
        match self {
            JobOutcome::Success { metrics } => JobResponse::success(metrics.render()),
            JobOutcome::Failure { error, .. } => error.to_response(),
        }
    }
}

/// Service trait for executing jobs
#[async_trait]
pub trait ExecutionService: Send + Sync {
    /// Runs a validated job to completion
    async fn execute(&self, request: JobRequest) -> JobOutcome;

    /// Parses a raw trigger body and runs it
    ///
    /// A body that does not parse is answered with 400 without touching the
    /// scratch directory or the store.
    async fn handle(&self, body: &[u8]) -> JobResponse {
        match TriggerRequest::parse_job(body) {
            Ok(request) => self.execute(request).await.into_response(),
            Err(e) => {
                warn!("Rejected job request: {}", e);
                JobError::from(e).to_response()
            }
        }
    }
}

/// Standard implementation of ExecutionService
pub struct StandardExecutionService {
    config: RunnerConfig,
    store: Arc<dyn ObjectStore>,
    stager: Stager,
    publisher: Publisher,
    runner: ProcessRunner,
}

impl StandardExecutionService {
    /// Creates a new execution service
    ///
    /// Downloads and uploads of all jobs run by this service share one
    /// transfer limit.
    pub fn new(config: RunnerConfig, store: Arc<dyn ObjectStore>) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent_transfers));
        Self {
            stager: Stager::new(Arc::clone(&store), Arc::clone(&permits)),
            publisher: Publisher::new(Arc::clone(&store), permits),
            runner: ProcessRunner::new(config.bundle_dir.clone(), config.execution_timeout),
            config,
            store,
        }
    }

    async fn run_pipeline(
        &self,
        request: &JobRequest,
        scratch: &ScratchSpace,
        metrics: &mut Metrics,
    ) -> Result<(), JobError> {
        scratch.clear().await?;

        metrics.mark_stage_start(Stage::Download);
        let files =
            Stager::download_set(&request.inputs, &request.executable, &self.config.bundle_dir)
                .await;
        self.stager
            .stage(files, &request.bucket, &request.prefix, scratch)
            .await?;
        metrics.mark_stage_end(Stage::Download);

        metrics.mark_stage_start(Stage::Execution);
        let report = self
            .runner
            .run(&request.executable, &request.args, scratch.path())
            .await?;
        metrics.mark_stage_end(Stage::Execution);

        if !report.success() {
            let proceed = request
                .continue_on_non_zero_exit
                .unwrap_or(self.config.continue_on_non_zero_exit);
            if !proceed {
                return Err(ExecutionError::NonZeroExit {
                    executable: report.executable,
                    code: report.code,
                }
                .into());
            }
            warn!(
                "'{}' exited with {:?}, uploading outputs anyway",
                report.executable, report.code
            );
        }

        metrics.mark_stage_start(Stage::Upload);
        self.publisher
            .publish(&request.outputs, &request.bucket, &request.prefix, scratch)
            .await?;
        metrics.mark_stage_end(Stage::Upload);

        Ok(())
    }

    async fn persist_log(&self, request: &JobRequest, metrics: &Metrics) -> Result<(), JobError> {
        let Some(key) = request.log_key() else {
            return Ok(());
        };

        self.store
            .put(
                &request.bucket,
                &key,
                Bytes::from(metrics.render()),
                LOG_CONTENT_TYPE,
            )
            .await
            .map_err(|source| JobError::LogPersist {
                key: key.clone(),
                source,
            })?;

        debug!("Persisted metrics to {}/{}", request.bucket, key);
        Ok(())
    }

    async fn execute_job(&self, job_id: Uuid, request: JobRequest) -> JobOutcome {
        info!(
            "Starting job: executable='{}' args={:?} inputs={} outputs={} bucket='{}' prefix='{}'",
            request.executable,
            request.args,
            request.inputs.len(),
            request.outputs.len(),
            request.bucket,
            request.prefix
        );

        let mut metrics = Metrics::started();

        let result = match ScratchSpace::create(&self.config.scratch_root, job_id).await {
            Ok(scratch) => {
                // Removes the directory even if this future is dropped mid-job
                let guard = scratch.guard(self.config.keep_scratch);
                let result = self.run_pipeline(&request, guard.space(), &mut metrics).await;
                guard.release().await;
                result
            }
            Err(e) => Err(e.into()),
        };

        metrics.finish();

        let result = match result {
            Ok(()) => self.persist_log(&request, &metrics).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                info!("Job completed: {}", metrics);
                JobOutcome::Success { metrics }
            }
            Err(error) => {
                error!("Job failed at {} stage: {}", error.stage(), error);
                JobOutcome::Failure { error, metrics }
            }
        }
    }
}

#[async_trait]
impl ExecutionService for StandardExecutionService {
    async fn execute(&self, request: JobRequest) -> JobOutcome {
        let job_id = Uuid::new_v4();
        let span = info_span!("job", %job_id, executable = %request.executable);
        self.execute_job(job_id, request).instrument(span).await
    }
}
