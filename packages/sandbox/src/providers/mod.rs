// ABOUTME: Container engine trait and shared types for sandbox lifecycle operations
// ABOUTME: Defines the abstract interface the runtime gateway drives for each job

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

pub mod docker;

pub use docker::DockerEngine;

/// CFS scheduling period used for CPU quotas (100ms)
pub const CPU_PERIOD_MICROS: i64 = 100_000;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Container error: {0}")]
    ContainerError(String),

    #[error("Container not found: {0}")]
    NotFound(String),

    #[error("Image error: {0}")]
    ImageError(String),

    #[error("Log stream error: {0}")]
    LogError(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Hard resource ceilings enforced by the container engine
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceLimits {
    /// Memory ceiling in megabytes, also applied as the memory+swap ceiling
    pub memory_mb: u64,
    /// Fraction of one core (0.5 = half a core per scheduling period)
    pub cpu_fraction: f64,
    /// Maximum number of processes inside the container
    pub pids_limit: Option<i64>,
}

impl ResourceLimits {
    pub fn memory_bytes(&self) -> i64 {
        (self.memory_mb * 1024 * 1024) as i64
    }

    /// CPU quota in microseconds per `CPU_PERIOD_MICROS`
    pub fn cpu_quota(&self) -> i64 {
        ((self.cpu_fraction * CPU_PERIOD_MICROS as f64).round() as i64).max(1_000)
    }
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            memory_mb: coderunner_config::DEFAULT_MEMORY_MB,
            cpu_fraction: coderunner_config::DEFAULT_CPU_FRACTION,
            pids_limit: Some(coderunner_config::DEFAULT_PIDS_LIMIT),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VolumeMount {
    pub host_path: String,
    pub container_path: String,
    pub readonly: bool,
}

impl VolumeMount {
    /// Docker bind specification (`host:container:mode`)
    pub fn to_bind(&self) -> String {
        format!(
            "{}:{}:{}",
            self.host_path,
            self.container_path,
            if self.readonly { "ro" } else { "rw" }
        )
    }
}

/// Container configuration for a single sandboxed run
#[derive(Debug, Clone)]
pub struct ContainerConfig {
    pub image: String,
    pub name: String,
    pub command: Vec<String>,
    pub user: String,
    pub working_dir: String,
    pub volumes: Vec<VolumeMount>,
    pub limits: ResourceLimits,
    pub network_disabled: bool,
    pub labels: HashMap<String, String>,
}

/// Container summary as reported by the engine's listing call
#[derive(Debug, Clone, serde::Serialize)]
pub struct ContainerInfo {
    pub id: String,
    pub name: String,
    pub image: String,
    pub state: String,
    pub status: String,
    /// Creation time as unix seconds
    pub created: i64,
    pub labels: HashMap<String, String>,
}

/// Buffered output read from a finished container
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapturedOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// Set when either stream exceeded the requested byte ceiling
    pub truncated: bool,
}

impl CapturedOutput {
    /// Append a chunk to one stream, respecting `max_bytes` per stream
    pub fn push(&mut self, stream: StreamType, data: &[u8], max_bytes: usize) {
        let buf = match stream {
            StreamType::Stdout => &mut self.stdout,
            StreamType::Stderr => &mut self.stderr,
        };
        let room = max_bytes.saturating_sub(buf.len());
        if data.len() > room {
            self.truncated = true;
        }
        buf.extend_from_slice(&data[..data.len().min(room)]);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamType {
    Stdout,
    Stderr,
}

/// Container engine backend used by the runtime gateway
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Check that the engine daemon answers
    async fn ping(&self) -> Result<()>;

    /// Check if an image exists locally
    async fn image_exists(&self, image: &str) -> Result<bool>;

    /// Create (but do not start) a container
    async fn create_container(&self, config: &ContainerConfig) -> Result<String>;

    async fn start_container(&self, container_id: &str) -> Result<()>;

    /// Block until the container stops and return its exit code
    async fn wait_container(&self, container_id: &str) -> Result<i64>;

    /// Read the complete stdout/stderr buffers of a container
    async fn read_logs(&self, container_id: &str, max_bytes: usize) -> Result<CapturedOutput>;

    /// Stop a container, killing it after `grace_secs`
    async fn stop_container(&self, container_id: &str, grace_secs: u64) -> Result<()>;

    async fn remove_container(&self, container_id: &str, force: bool) -> Result<()>;

    /// List containers carrying all of the given `key=value` labels
    async fn list_containers(
        &self,
        labels: &[String],
        include_stopped: bool,
    ) -> Result<Vec<ContainerInfo>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_quota_from_fraction() {
        let limits = ResourceLimits {
            memory_mb: 128,
            cpu_fraction: 0.5,
            pids_limit: None,
        };
        assert_eq!(limits.cpu_quota(), 50_000);
        assert_eq!(limits.memory_bytes(), 128 * 1024 * 1024);
    }

    #[test]
    fn test_cpu_quota_has_floor() {
        let limits = ResourceLimits {
            cpu_fraction: 0.0001,
            ..Default::default()
        };
        assert_eq!(limits.cpu_quota(), 1_000);
    }

    #[test]
    fn test_volume_bind_mode() {
        let mount = VolumeMount {
            host_path: "/tmp/job".to_string(),
            container_path: "/tmp/code".to_string(),
            readonly: true,
        };
        assert_eq!(mount.to_bind(), "/tmp/job:/tmp/code:ro");
    }

    #[test]
    fn test_captured_output_truncates_per_stream() {
        let mut output = CapturedOutput::default();
        output.push(StreamType::Stdout, b"hello", 8);
        output.push(StreamType::Stdout, b"world", 8);
        output.push(StreamType::Stderr, b"oops", 8);

        assert_eq!(output.stdout, b"hellowor");
        assert_eq!(output.stderr, b"oops");
        assert!(output.truncated);
    }
}
