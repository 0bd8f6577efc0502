// ABOUTME: Runtime gateway owning the container engine connection and startup checks
// ABOUTME: Exposes sandbox primitives (create, start, wait, read, stop, remove, list) per job

use crate::command::LaunchCommand;
use crate::error::GatewayError;
use crate::providers::{
    CapturedOutput, ContainerConfig, ContainerEngine, ContainerInfo, DockerEngine, EngineError,
    ResourceLimits, VolumeMount,
};
use chrono::Utc;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Labels applied to every sandbox for tracking
pub const MANAGED_LABEL: &str = "coderunner.managed";
pub const JOB_LABEL: &str = "coderunner.job_id";

const CONTAINER_NAME_PREFIX: &str = "coderunner-";

/// Everything needed to create one job's sandbox
#[derive(Debug, Clone)]
pub struct SandboxSpec {
    pub job_id: String,
    pub command: LaunchCommand,
    /// Host directory bound read-only into the sandbox
    pub host_dir: PathBuf,
    /// Mount point inside the sandbox, also its working directory
    pub mount_path: String,
    pub limits: ResourceLimits,
    pub user: String,
}

/// Reference to a created sandbox
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxHandle {
    pub id: String,
    pub name: String,
    pub job_id: String,
}

/// How a bounded wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Exited(i64),
    TimedOut,
}

pub struct RuntimeGateway {
    engine: Arc<dyn ContainerEngine>,
    image: String,
}

impl RuntimeGateway {
    /// Connect to the local Docker engine and run the startup checks
    pub async fn connect(image: impl Into<String>) -> Result<Self, GatewayError> {
        let engine =
            DockerEngine::new().map_err(|e| GatewayError::EngineUnavailable(e.to_string()))?;
        Self::initialize(Arc::new(engine), image).await
    }

    /// Verify the engine answers and the execution image is present
    ///
    /// Runs once per process so jobs never pay for the image lookup.
    pub async fn initialize(
        engine: Arc<dyn ContainerEngine>,
        image: impl Into<String>,
    ) -> Result<Self, GatewayError> {
        let gateway = Self {
            engine,
            image: image.into(),
        };

        gateway.engine.ping().await.map_err(|e| {
            warn!("Container engine unreachable: {}", e);
            GatewayError::EngineUnavailable(e.to_string())
        })?;
        info!("Connected to container engine");

        gateway.ensure_image(&gateway.image).await?;
        info!("Execution image '{}' found", gateway.image);

        Ok(gateway)
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub async fn ensure_image(&self, image: &str) -> Result<(), GatewayError> {
        match self.engine.image_exists(image).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(GatewayError::ImageMissing {
                image: image.to_string(),
            }),
            Err(e) => Err(GatewayError::EngineUnavailable(e.to_string())),
        }
    }

    /// Readiness probe; any failure is reported as `false`
    pub async fn health_check(&self) -> bool {
        if let Err(e) = self.engine.ping().await {
            debug!("Health check ping failed: {}", e);
            return false;
        }

        match self.engine.image_exists(&self.image).await {
            Ok(present) => present,
            Err(e) => {
                debug!("Health check image lookup failed: {}", e);
                false
            }
        }
    }

    /// Create (without starting) the sandbox for one job
    pub async fn create_sandbox(&self, spec: &SandboxSpec) -> Result<SandboxHandle, EngineError> {
        let name = format!("{}{}", CONTAINER_NAME_PREFIX, spec.job_id);

        let labels = HashMap::from([
            (MANAGED_LABEL.to_string(), "true".to_string()),
            (JOB_LABEL.to_string(), spec.job_id.clone()),
        ]);

        let config = ContainerConfig {
            image: self.image.clone(),
            name: name.clone(),
            command: spec.command.to_argv(),
            user: spec.user.clone(),
            working_dir: spec.mount_path.clone(),
            volumes: vec![VolumeMount {
                host_path: spec.host_dir.to_string_lossy().to_string(),
                container_path: spec.mount_path.clone(),
                readonly: true,
            }],
            limits: spec.limits.clone(),
            network_disabled: true,
            labels,
        };

        let id = self.engine.create_container(&config).await?;

        Ok(SandboxHandle {
            id,
            name,
            job_id: spec.job_id.clone(),
        })
    }

    pub async fn start(&self, handle: &SandboxHandle) -> Result<(), EngineError> {
        self.engine.start_container(&handle.id).await
    }

    /// Wait for the sandbox to exit, giving up after `timeout`
    ///
    /// Dropping the engine wait on expiry leaves the container running; the
    /// caller is expected to stop and remove it.
    pub async fn wait(
        &self,
        handle: &SandboxHandle,
        timeout: Duration,
    ) -> Result<WaitOutcome, EngineError> {
        match tokio::time::timeout(timeout, self.engine.wait_container(&handle.id)).await {
            Ok(Ok(code)) => Ok(WaitOutcome::Exited(code)),
            Ok(Err(e)) => Err(e),
            Err(_elapsed) => Ok(WaitOutcome::TimedOut),
        }
    }

    pub async fn read_output(
        &self,
        handle: &SandboxHandle,
        max_bytes: usize,
    ) -> Result<CapturedOutput, EngineError> {
        self.engine.read_logs(&handle.id, max_bytes).await
    }

    pub async fn stop(&self, handle: &SandboxHandle, grace_secs: u64) -> Result<(), EngineError> {
        self.engine.stop_container(&handle.id, grace_secs).await
    }

    /// Force-remove the sandbox, killing it if it is still running
    pub async fn remove(&self, handle: &SandboxHandle) -> Result<(), EngineError> {
        self.engine.remove_container(&handle.id, true).await
    }

    /// List sandboxes created by this service, optionally for a single job
    pub async fn list_sandboxes(
        &self,
        job_id: Option<&str>,
    ) -> Result<Vec<ContainerInfo>, EngineError> {
        let mut labels = vec![format!("{}=true", MANAGED_LABEL)];
        if let Some(job_id) = job_id {
            labels.push(format!("{}={}", JOB_LABEL, job_id));
        }

        self.engine.list_containers(&labels, true).await
    }

    /// Force-remove every sandbox labelled with `job_id`
    pub async fn remove_job_sandboxes(&self, job_id: &str) -> Result<usize, EngineError> {
        let sandboxes = self.list_sandboxes(Some(job_id)).await?;
        for sandbox in &sandboxes {
            self.engine.remove_container(&sandbox.id, true).await?;
        }
        Ok(sandboxes.len())
    }

    /// Remove managed sandboxes older than `max_age`
    ///
    /// Jobs always tear down their own sandbox; anything this old was left
    /// behind by a crashed or killed process. A `max_age` reaching before the
    /// unix epoch matches nothing.
    pub async fn reap_stale_sandboxes(
        &self,
        max_age: Duration,
    ) -> Result<Vec<String>, EngineError> {
        let cutoff = i64::try_from(max_age.as_secs())
            .ok()
            .and_then(|age| Utc::now().timestamp().checked_sub(age))
            .filter(|cutoff| *cutoff > 0);
        let Some(cutoff) = cutoff else {
            debug!("Max age {:?} predates every sandbox, nothing to reap", max_age);
            return Ok(Vec::new());
        };
        let mut removed = Vec::new();

        for sandbox in self.list_sandboxes(None).await? {
            if sandbox.created >= cutoff {
                continue;
            }

            info!(
                "Reaping stale sandbox {} ({}, state: {})",
                sandbox.name, sandbox.id, sandbox.state
            );

            match self.engine.remove_container(&sandbox.id, true).await {
                Ok(()) => removed.push(sandbox.id),
                Err(e) => warn!("Failed to reap sandbox {}: {}", sandbox.id, e),
            }
        }

        Ok(removed)
    }
}
