// ABOUTME: Request and result types for sandboxed executions
// ABOUTME: Validates request bounds and models the three-way execution outcome

use crate::error::{ExecutionError, RequestError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Largest accepted source file (64 KiB)
pub const MAX_CODE_BYTES: usize = 64 * 1024;
/// Largest accepted stdin payload (64 KiB)
pub const MAX_STDIN_BYTES: usize = 64 * 1024;
pub const MIN_TIMEOUT_SECS: u64 = 1;
pub const MAX_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// A validated request to run one program
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionRequest {
    code: String,
    stdin: String,
    timeout_seconds: u64,
}

impl ExecutionRequest {
    pub fn new(
        code: impl Into<String>,
        stdin: impl Into<String>,
        timeout_seconds: u64,
    ) -> Result<Self, RequestError> {
        let code = code.into();
        let stdin = stdin.into();

        if code.len() > MAX_CODE_BYTES {
            return Err(RequestError::CodeTooLarge {
                size: code.len(),
                limit: MAX_CODE_BYTES,
            });
        }

        if stdin.len() > MAX_STDIN_BYTES {
            return Err(RequestError::StdinTooLarge {
                size: stdin.len(),
                limit: MAX_STDIN_BYTES,
            });
        }

        if !(MIN_TIMEOUT_SECS..=MAX_TIMEOUT_SECS).contains(&timeout_seconds) {
            return Err(RequestError::TimeoutOutOfRange {
                value: timeout_seconds,
                min: MIN_TIMEOUT_SECS,
                max: MAX_TIMEOUT_SECS,
            });
        }

        Ok(Self {
            code,
            stdin,
            timeout_seconds,
        })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn stdin(&self) -> &str {
        &self.stdin
    }

    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Outcome class of an execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Success,
    Error,
    Timeout,
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExecutionStatus::Success => "success",
            ExecutionStatus::Error => "error",
            ExecutionStatus::Timeout => "timeout",
        };
        write!(f, "{}", s)
    }
}

/// Structured result handed back to the caller of an execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Captured standard output
    pub output: String,
    /// Captured standard error, or a description of what went wrong
    pub error: String,
    /// Wall-clock seconds spent waiting on the program, millisecond precision
    #[serde(rename = "execution_time")]
    pub execution_time_seconds: f64,
    pub status: ExecutionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i64>,
}

impl ExecutionResult {
    /// Classify a program that ran to completion
    pub fn completed(exit_code: i64, stdout: String, stderr: String, elapsed: Duration) -> Self {
        let (status, error) = if exit_code == 0 {
            (ExecutionStatus::Success, stderr)
        } else if stderr.is_empty() {
            (
                ExecutionStatus::Error,
                ExecutionError::NonZeroExit { code: exit_code }.to_string(),
            )
        } else {
            (ExecutionStatus::Error, stderr)
        };

        Self {
            output: stdout,
            error,
            execution_time_seconds: round_millis(elapsed),
            status,
            exit_code: Some(exit_code),
        }
    }

    /// Fold a job failure into a result
    pub fn from_error(err: &ExecutionError) -> Self {
        match err {
            ExecutionError::TimeoutExceeded { seconds } => Self {
                output: String::new(),
                error: err.to_string(),
                execution_time_seconds: *seconds as f64,
                status: ExecutionStatus::Timeout,
                exit_code: None,
            },
            _ => Self::failed(format!("Execution error: {}", err)),
        }
    }

    /// An error result that never reached the program
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            output: String::new(),
            error: message.into(),
            execution_time_seconds: 0.0,
            status: ExecutionStatus::Error,
            exit_code: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Success
    }
}

fn round_millis(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 1000.0).round() / 1000.0
}
