// ABOUTME: Error types for the runtime gateway and per-job execution
// ABOUTME: Separates startup-fatal gateway failures from job failures that collapse into results

use crate::providers::EngineError;
use thiserror::Error;

/// Startup failures of the runtime gateway
///
/// Both variants are fatal: the service must not report itself ready and the
/// check is never retried automatically.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Container engine is not running or not accessible: {0}")]
    EngineUnavailable(String),

    #[error(
        "Execution image '{image}' not found. Build it first with: \
         docker build -t {image} -f docker/Dockerfile.python docker/"
    )]
    ImageMissing { image: String },
}

/// Failures of a single job
///
/// None of these escape `SandboxExecutor::execute`; each one is folded into an
/// `ExecutionResult`.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("failed to stage job files: {0}")]
    Staging(#[source] std::io::Error),

    #[error("failed to launch sandbox: {0}")]
    Launch(#[source] EngineError),

    #[error("failed while waiting for sandbox: {0}")]
    Wait(#[source] EngineError),

    #[error("failed to collect sandbox output: {0}")]
    Collection(#[source] EngineError),

    #[error("Execution timed out after {seconds} seconds")]
    TimeoutExceeded { seconds: u64 },

    /// Reported when a failing program wrote nothing to stderr
    #[error("Process exited with code {code}")]
    NonZeroExit { code: i64 },
}

/// Rejected execution requests
#[derive(Error, Debug, PartialEq)]
pub enum RequestError {
    #[error("source code is {size} bytes, limit is {limit}")]
    CodeTooLarge { size: usize, limit: usize },

    #[error("stdin is {size} bytes, limit is {limit}")]
    StdinTooLarge { size: usize, limit: usize },

    #[error("timeout must be between {min} and {max} seconds, got {value}")]
    TimeoutOutOfRange { value: u64, min: u64, max: u64 },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },

    #[error("{name} is out of range: {value}")]
    OutOfRange { name: &'static str, value: String },
}
