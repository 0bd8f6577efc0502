// ABOUTME: Sandboxed run controller executing one request per job to a structured result
// ABOUTME: Stages files, launches a capped container, bounds the wait, classifies and tears down

use crate::command::LaunchCommand;
use crate::error::ExecutionError;
use crate::gateway::{RuntimeGateway, SandboxHandle, SandboxSpec, WaitOutcome};
use crate::settings::ExecutorSettings;
use crate::staging::{StagedJob, INPUT_FILE, SOURCE_FILE};
use crate::types::{ExecutionRequest, ExecutionResult};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

const TRUNCATION_NOTICE: &str = "\n[output truncated]";

/// Executes untrusted programs, one container per job
pub struct SandboxExecutor {
    gateway: Arc<RuntimeGateway>,
    settings: ExecutorSettings,
}

impl SandboxExecutor {
    pub fn new(gateway: Arc<RuntimeGateway>, settings: ExecutorSettings) -> Self {
        Self { gateway, settings }
    }

    pub fn gateway(&self) -> &Arc<RuntimeGateway> {
        &self.gateway
    }

    pub fn settings(&self) -> &ExecutorSettings {
        &self.settings
    }

    /// Readiness of the underlying engine and image
    pub async fn is_ready(&self) -> bool {
        self.gateway.health_check().await
    }

    /// Validate raw inputs and execute them
    ///
    /// Rejected inputs produce an `error` result rather than a Rust error.
    pub async fn run(&self, code: &str, stdin: &str, timeout_seconds: u64) -> ExecutionResult {
        match ExecutionRequest::new(code, stdin, timeout_seconds) {
            Ok(request) => self.execute(&request).await,
            Err(e) => {
                debug!("Rejected execution request: {}", e);
                ExecutionResult::failed(format!("Invalid request: {}", e))
            }
        }
    }

    /// Execute one request to completion
    ///
    /// Never fails: every failure mode is folded into the returned result, and
    /// no sandbox or staged file outlives the call.
    pub async fn execute(&self, request: &ExecutionRequest) -> ExecutionResult {
        let job_id = Uuid::new_v4().to_string();
        let span = info_span!("job", job_id = %job_id);

        async {
            info!(
                "Starting execution (timeout: {}s, code: {} bytes, stdin: {} bytes)",
                request.timeout_seconds(),
                request.code().len(),
                request.stdin().len()
            );

            let staged = match StagedJob::stage(
                self.settings.staging_dir.as_deref(),
                request.code(),
                request.stdin(),
            ) {
                Ok(staged) => staged,
                Err(e) => {
                    warn!("Failed to stage job files: {}", e);
                    return ExecutionResult::from_error(&ExecutionError::Staging(e));
                }
            };

            let result = self.run_staged(&job_id, &staged, request).await;

            if let Err(e) = staged.close() {
                warn!("Failed to remove staged job files: {}", e);
            }

            info!(
                "Execution finished with status {} in {:.3}s",
                result.status, result.execution_time_seconds
            );
            result
        }
        .instrument(span)
        .await
    }

    async fn run_staged(
        &self,
        job_id: &str,
        staged: &StagedJob,
        request: &ExecutionRequest,
    ) -> ExecutionResult {
        let spec = self.sandbox_spec(job_id, staged);

        // Held across creation so a cancelled create is still cleaned up
        let mut lease = SandboxLease::new(
            Arc::clone(&self.gateway),
            job_id,
            self.settings.stop_grace_secs,
        );

        let handle = match self.gateway.create_sandbox(&spec).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Failed to create sandbox: {}", e);
                lease.release().await;
                return ExecutionResult::from_error(&ExecutionError::Launch(e));
            }
        };
        lease.attach(handle.clone());

        let outcome = self.drive(&handle, request).await;
        lease.release().await;

        match outcome {
            Ok(result) => result,
            Err(e) => {
                if !matches!(e, ExecutionError::TimeoutExceeded { .. }) {
                    warn!("Execution failed: {}", e);
                }
                ExecutionResult::from_error(&e)
            }
        }
    }

    /// Start, wait, collect and classify; teardown is the caller's job
    async fn drive(
        &self,
        handle: &SandboxHandle,
        request: &ExecutionRequest,
    ) -> Result<ExecutionResult, ExecutionError> {
        self.gateway
            .start(handle)
            .await
            .map_err(ExecutionError::Launch)?;

        let started = Instant::now();
        let outcome = self
            .gateway
            .wait(handle, request.timeout())
            .await
            .map_err(ExecutionError::Wait)?;
        let elapsed = started.elapsed();

        let exit_code = match outcome {
            WaitOutcome::Exited(code) => code,
            WaitOutcome::TimedOut => {
                info!("Sandbox {} exceeded {}s", handle.name, request.timeout_seconds());
                return Err(ExecutionError::TimeoutExceeded {
                    seconds: request.timeout_seconds(),
                });
            }
        };

        let captured = self
            .gateway
            .read_output(handle, self.settings.max_output_bytes)
            .await
            .map_err(ExecutionError::Collection)?;

        let mut stdout = String::from_utf8_lossy(&captured.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&captured.stderr).into_owned();
        if captured.truncated {
            stdout.push_str(TRUNCATION_NOTICE);
        }

        debug!("Sandbox {} exited with code {}", handle.name, exit_code);
        Ok(ExecutionResult::completed(exit_code, stdout, stderr, elapsed))
    }

    fn sandbox_spec(&self, job_id: &str, staged: &StagedJob) -> SandboxSpec {
        let mount = self.settings.mount_path.trim_end_matches('/');
        let mut command = LaunchCommand::interpreter(
            &self.settings.interpreter,
            &format!("{}/{}", mount, SOURCE_FILE),
        );
        if staged.has_stdin() {
            command = command.with_stdin_file(format!("{}/{}", mount, INPUT_FILE));
        }

        SandboxSpec {
            job_id: job_id.to_string(),
            command,
            host_dir: staged.path().to_path_buf(),
            mount_path: mount.to_string(),
            limits: self.settings.resource_limits(),
            user: self.settings.user.clone(),
        }
    }
}

/// Scoped ownership of one job's sandbox
///
/// The lease exists from before the sandbox is created. `release` stops and
/// removes the attached sandbox, logging any failure. If the lease is dropped
/// unreleased (the job future was cancelled) a forced removal is scheduled on
/// the current runtime: by id once a handle is attached, otherwise by job label
/// to catch a create that was cancelled mid-flight.
struct SandboxLease {
    gateway: Arc<RuntimeGateway>,
    job_id: String,
    handle: Option<SandboxHandle>,
    grace_secs: u64,
    released: bool,
}

impl SandboxLease {
    fn new(gateway: Arc<RuntimeGateway>, job_id: &str, grace_secs: u64) -> Self {
        Self {
            gateway,
            job_id: job_id.to_string(),
            handle: None,
            grace_secs,
            released: false,
        }
    }

    fn attach(&mut self, handle: SandboxHandle) {
        self.handle = Some(handle);
    }

    async fn release(mut self) {
        if let Some(handle) = &self.handle {
            teardown(&self.gateway, handle, self.grace_secs).await;
        }
        self.released = true;
    }
}

impl Drop for SandboxLease {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                warn!(
                    "No runtime to remove sandbox of job {}; leaving it to the stale reaper",
                    self.job_id
                );
                return;
            }
        };

        let gateway = Arc::clone(&self.gateway);
        match self.handle.take() {
            Some(handle) => {
                warn!("Sandbox {} dropped without release, scheduling removal", handle.name);
                runtime.spawn(async move {
                    if let Err(e) = gateway.remove(&handle).await {
                        warn!("Deferred removal of sandbox {} failed: {}", handle.name, e);
                    }
                });
            }
            None => {
                let job_id = self.job_id.clone();
                warn!("Job {} cancelled while creating its sandbox, scheduling removal", job_id);
                runtime.spawn(async move {
                    if let Err(e) = gateway.remove_job_sandboxes(&job_id).await {
                        warn!("Deferred removal for job {} failed: {}", job_id, e);
                    }
                });
            }
        }
    }
}

async fn teardown(gateway: &RuntimeGateway, handle: &SandboxHandle, grace_secs: u64) {
    if let Err(e) = gateway.stop(handle, grace_secs).await {
        debug!("Stopping sandbox {} failed: {}", handle.name, e);
    }
    match gateway.remove(handle).await {
        Ok(()) => debug!("Removed sandbox {}", handle.name),
        Err(e) => warn!("Removing sandbox {} failed: {}", handle.name, e),
    }
}
