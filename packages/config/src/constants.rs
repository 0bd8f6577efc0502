// ABOUTME: Environment variable name constants and defaults
// ABOUTME: Centralized definitions of all environment variable names used across coderunner

// Execution Image
pub const CODERUNNER_IMAGE: &str = "CODERUNNER_IMAGE";
pub const DEFAULT_IMAGE: &str = "python-executor:latest";

// Program Invocation
pub const CODERUNNER_INTERPRETER: &str = "CODERUNNER_INTERPRETER";
pub const DEFAULT_INTERPRETER: &str = "python3";
pub const CODERUNNER_USER: &str = "CODERUNNER_USER";
pub const DEFAULT_USER: &str = "coderunner";
pub const CODERUNNER_MOUNT_PATH: &str = "CODERUNNER_MOUNT_PATH";
pub const DEFAULT_MOUNT_PATH: &str = "/tmp/code";

// Resource Ceilings
pub const CODERUNNER_MEMORY_MB: &str = "CODERUNNER_MEMORY_MB";
pub const DEFAULT_MEMORY_MB: u64 = 128;
pub const CODERUNNER_CPU_FRACTION: &str = "CODERUNNER_CPU_FRACTION";
pub const DEFAULT_CPU_FRACTION: f64 = 0.5;
pub const CODERUNNER_PIDS_LIMIT: &str = "CODERUNNER_PIDS_LIMIT";
pub const DEFAULT_PIDS_LIMIT: i64 = 64;
pub const CODERUNNER_MAX_OUTPUT_BYTES: &str = "CODERUNNER_MAX_OUTPUT_BYTES";
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 1024 * 1024;

// Teardown
pub const CODERUNNER_STOP_GRACE_SECS: &str = "CODERUNNER_STOP_GRACE_SECS";
pub const DEFAULT_STOP_GRACE_SECS: u64 = 1;

// Staging
pub const CODERUNNER_STAGING_DIR: &str = "CODERUNNER_STAGING_DIR";

// Stale Sandbox Reaper
pub const CODERUNNER_REAP_INTERVAL_MINUTES: &str = "CODERUNNER_REAP_INTERVAL_MINUTES";
pub const DEFAULT_REAP_INTERVAL_MINUTES: u64 = 5;
pub const CODERUNNER_REAP_MAX_AGE_MINUTES: &str = "CODERUNNER_REAP_MAX_AGE_MINUTES";
pub const DEFAULT_REAP_MAX_AGE_MINUTES: u64 = 10;

// Logging
pub const RUST_LOG: &str = "RUST_LOG";
