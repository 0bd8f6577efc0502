// ABOUTME: Sandboxed execution of untrusted Python programs in Docker containers
// ABOUTME: Runtime gateway for engine checks plus a per-job run controller with guaranteed teardown

pub mod command;
pub mod error;
pub mod executor;
pub mod gateway;
pub mod providers;
pub mod reaper;
pub mod settings;
pub mod staging;
pub mod types;

pub use command::LaunchCommand;
pub use error::{ConfigError, ExecutionError, GatewayError, RequestError};
pub use executor::SandboxExecutor;
pub use gateway::{RuntimeGateway, SandboxHandle, SandboxSpec, WaitOutcome, JOB_LABEL, MANAGED_LABEL};
pub use providers::{
    CapturedOutput, ContainerConfig, ContainerEngine, ContainerInfo, DockerEngine, EngineError,
    ResourceLimits, StreamType, VolumeMount,
};
pub use reaper::start_reaper_task;
pub use settings::{ExecutorSettings, MAX_REAP_MAX_AGE_MINUTES};
pub use staging::StagedJob;
pub use types::{
    ExecutionRequest, ExecutionResult, ExecutionStatus, DEFAULT_TIMEOUT_SECS, MAX_CODE_BYTES,
    MAX_STDIN_BYTES, MAX_TIMEOUT_SECS, MIN_TIMEOUT_SECS,
};
