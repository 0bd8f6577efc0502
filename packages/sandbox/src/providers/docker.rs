// ABOUTME: Docker engine implementation for container-backed sandboxes
// ABOUTME: Uses the bollard library to create, wait on, read and tear down job containers

use super::{
    CapturedOutput, ContainerConfig, ContainerEngine, ContainerInfo, EngineError, Result,
    StreamType,
};
use async_trait::async_trait;
use bollard::{
    container::{
        Config, CreateContainerOptions, ListContainersOptions, LogOutput, LogsOptions,
        RemoveContainerOptions, StartContainerOptions, StopContainerOptions,
        WaitContainerOptions,
    },
    errors::Error as BollardError,
    models::HostConfig,
    Docker,
};
use futures::StreamExt;
use std::collections::HashMap;
use tracing::{debug, info, warn};

pub struct DockerEngine {
    client: Docker,
}

impl DockerEngine {
    /// Create a Docker engine client using the platform defaults
    ///
    /// On Unix this is `/var/run/docker.sock` (or `DOCKER_HOST`), on Windows the
    /// `docker_engine` named pipe. No request is made until the first call.
    pub fn new() -> Result<Self> {
        let client = Docker::connect_with_defaults()
            .map_err(|e| EngineError::ConnectionError(e.to_string()))?;

        Ok(Self { client })
    }

    /// Create with a specific Docker connection
    pub fn with_client(client: Docker) -> Self {
        Self { client }
    }

    /// Convert our config to bollard config
    fn to_bollard_config(config: &ContainerConfig) -> Config<String> {
        let binds: Vec<String> = config.volumes.iter().map(|v| v.to_bind()).collect();
        let memory = config.limits.memory_bytes();

        let host_config = HostConfig {
            binds: Some(binds),
            memory: Some(memory),
            // Equal to memory so the program cannot spill into swap
            memory_swap: Some(memory),
            cpu_period: Some(super::CPU_PERIOD_MICROS),
            cpu_quota: Some(config.limits.cpu_quota()),
            pids_limit: config.limits.pids_limit,
            network_mode: config.network_disabled.then(|| "none".to_string()),
            cap_drop: Some(vec!["ALL".to_string()]),
            security_opt: Some(vec!["no-new-privileges".to_string()]),
            privileged: Some(false),
            ..Default::default()
        };

        Config {
            image: Some(config.image.clone()),
            cmd: Some(config.command.clone()),
            user: Some(config.user.clone()),
            working_dir: Some(config.working_dir.clone()),
            labels: Some(config.labels.clone()),
            network_disabled: Some(config.network_disabled),
            attach_stdin: Some(false),
            open_stdin: Some(false),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            tty: Some(false),
            host_config: Some(host_config),
            ..Default::default()
        }
    }

    fn is_status(e: &BollardError, code: u16) -> bool {
        matches!(e, BollardError::DockerResponseServerError { status_code, .. } if *status_code == code)
    }
}

#[async_trait]
impl ContainerEngine for DockerEngine {
    async fn ping(&self) -> Result<()> {
        self.client
            .ping()
            .await
            .map(|_| ())
            .map_err(|e| EngineError::ConnectionError(e.to_string()))
    }

    async fn image_exists(&self, image: &str) -> Result<bool> {
        match self.client.inspect_image(image).await {
            Ok(_) => Ok(true),
            Err(e) if Self::is_status(&e, 404) => Ok(false),
            Err(e) => Err(EngineError::ImageError(e.to_string())),
        }
    }

    async fn create_container(&self, config: &ContainerConfig) -> Result<String> {
        debug!("Creating container {} from {}", config.name, config.image);

        let options = CreateContainerOptions {
            name: config.name.clone(),
            platform: None,
        };

        let response = self
            .client
            .create_container(Some(options), Self::to_bollard_config(config))
            .await
            .map_err(|e| EngineError::ContainerError(e.to_string()))?;

        for warning in &response.warnings {
            warn!("Docker warning for {}: {}", config.name, warning);
        }

        info!("Created container {} ({})", config.name, response.id);
        Ok(response.id)
    }

    async fn start_container(&self, container_id: &str) -> Result<()> {
        debug!("Starting container {}", container_id);

        self.client
            .start_container(container_id, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| EngineError::ContainerError(e.to_string()))
    }

    async fn wait_container(&self, container_id: &str) -> Result<i64> {
        let options = WaitContainerOptions {
            condition: "not-running".to_string(),
        };

        let mut stream = self.client.wait_container(container_id, Some(options));

        match stream.next().await {
            Some(Ok(response)) => Ok(response.status_code),
            // bollard reports a non-zero exit as an error carrying the code
            Some(Err(BollardError::DockerContainerWaitError { code, .. })) => Ok(code),
            Some(Err(e)) if Self::is_status(&e, 404) => {
                Err(EngineError::NotFound(container_id.to_string()))
            }
            Some(Err(e)) => Err(EngineError::ContainerError(e.to_string())),
            None => Err(EngineError::ContainerError(format!(
                "Wait stream for {} ended without a status",
                container_id
            ))),
        }
    }

    async fn read_logs(&self, container_id: &str, max_bytes: usize) -> Result<CapturedOutput> {
        let options = LogsOptions::<String> {
            follow: false,
            stdout: true,
            stderr: true,
            timestamps: false,
            tail: "all".to_string(),
            ..Default::default()
        };

        let mut stream = self.client.logs(container_id, Some(options));
        let mut output = CapturedOutput::default();

        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(LogOutput::StdOut { message }) | Ok(LogOutput::Console { message }) => {
                    output.push(StreamType::Stdout, &message, max_bytes)
                }
                Ok(LogOutput::StdErr { message }) => {
                    output.push(StreamType::Stderr, &message, max_bytes)
                }
                Ok(LogOutput::StdIn { .. }) => {}
                Err(e) => return Err(EngineError::LogError(e.to_string())),
            }
        }

        Ok(output)
    }

    async fn stop_container(&self, container_id: &str, grace_secs: u64) -> Result<()> {
        debug!("Stopping container {} (grace: {}s)", container_id, grace_secs);

        let options = StopContainerOptions {
            t: grace_secs as i64,
        };

        match self.client.stop_container(container_id, Some(options)).await {
            Ok(_) => Ok(()),
            // Container already stopped is not an error
            Err(e) if Self::is_status(&e, 304) => Ok(()),
            Err(e) if Self::is_status(&e, 404) => {
                Err(EngineError::NotFound(container_id.to_string()))
            }
            Err(e) => Err(EngineError::ContainerError(e.to_string())),
        }
    }

    async fn remove_container(&self, container_id: &str, force: bool) -> Result<()> {
        debug!("Removing container {} (force: {})", container_id, force);

        let options = RemoveContainerOptions {
            force,
            v: true,
            ..Default::default()
        };

        match self.client.remove_container(container_id, Some(options)).await {
            Ok(_) => Ok(()),
            // Already removed
            Err(e) if Self::is_status(&e, 404) => Ok(()),
            Err(e) => Err(EngineError::ContainerError(e.to_string())),
        }
    }

    async fn list_containers(
        &self,
        labels: &[String],
        include_stopped: bool,
    ) -> Result<Vec<ContainerInfo>> {
        let mut filters = HashMap::new();
        filters.insert("label".to_string(), labels.to_vec());

        let options = ListContainersOptions {
            all: include_stopped,
            filters,
            ..Default::default()
        };

        let containers = self
            .client
            .list_containers(Some(options))
            .await
            .map_err(|e| EngineError::ContainerError(e.to_string()))?;

        Ok(containers
            .into_iter()
            .map(|c| ContainerInfo {
                id: c.id.unwrap_or_default(),
                name: c
                    .names
                    .unwrap_or_default()
                    .first()
                    .map(|n| n.trim_start_matches('/').to_string())
                    .unwrap_or_default(),
                image: c.image.unwrap_or_default(),
                state: c.state.unwrap_or_default(),
                status: c.status.unwrap_or_default(),
                created: c.created.unwrap_or(0),
                labels: c.labels.unwrap_or_default(),
            })
            .collect())
    }
}
