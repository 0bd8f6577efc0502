// ABOUTME: Executor settings loaded from environment variables with validated defaults
// ABOUTME: Covers the execution image, resource ceilings, teardown and reaper timing

use crate::error::ConfigError;
use crate::providers::ResourceLimits;
use coderunner_config as env_names;
use serde::Serialize;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Longest accepted stale-sandbox age (one week)
pub const MAX_REAP_MAX_AGE_MINUTES: u64 = 7 * 24 * 60;

#[derive(Debug, Clone, Serialize)]
pub struct ExecutorSettings {
    // Execution Image
    pub image: String,

    // Program Invocation
    pub interpreter: String,
    pub user: String,
    pub mount_path: String,

    // Resource Limits
    pub memory_mb: u64,
    pub cpu_fraction: f64,
    pub pids_limit: i64,
    pub max_output_bytes: usize,

    // Lifecycle Settings
    pub stop_grace_secs: u64,
    pub staging_dir: Option<PathBuf>,
    pub reap_interval_minutes: u64,
    pub reap_max_age_minutes: u64,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            image: env_names::DEFAULT_IMAGE.to_string(),
            interpreter: env_names::DEFAULT_INTERPRETER.to_string(),
            user: env_names::DEFAULT_USER.to_string(),
            mount_path: env_names::DEFAULT_MOUNT_PATH.to_string(),
            memory_mb: env_names::DEFAULT_MEMORY_MB,
            cpu_fraction: env_names::DEFAULT_CPU_FRACTION,
            pids_limit: env_names::DEFAULT_PIDS_LIMIT,
            max_output_bytes: env_names::DEFAULT_MAX_OUTPUT_BYTES,
            stop_grace_secs: env_names::DEFAULT_STOP_GRACE_SECS,
            staging_dir: None,
            reap_interval_minutes: env_names::DEFAULT_REAP_INTERVAL_MINUTES,
            reap_max_age_minutes: env_names::DEFAULT_REAP_MAX_AGE_MINUTES,
        }
    }
}

impl ExecutorSettings {
    /// Load settings from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load settings through an arbitrary variable lookup
    ///
    /// Unset or blank variables fall back to defaults; malformed or out of range
    /// values are rejected rather than silently replaced.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let settings = Self {
            image: get(env_names::CODERUNNER_IMAGE).unwrap_or(defaults.image),
            interpreter: get(env_names::CODERUNNER_INTERPRETER).unwrap_or(defaults.interpreter),
            user: get(env_names::CODERUNNER_USER).unwrap_or(defaults.user),
            mount_path: get(env_names::CODERUNNER_MOUNT_PATH).unwrap_or(defaults.mount_path),
            memory_mb: parse(
                env_names::CODERUNNER_MEMORY_MB,
                get(env_names::CODERUNNER_MEMORY_MB),
                defaults.memory_mb,
            )?,
            cpu_fraction: parse(
                env_names::CODERUNNER_CPU_FRACTION,
                get(env_names::CODERUNNER_CPU_FRACTION),
                defaults.cpu_fraction,
            )?,
            pids_limit: parse(
                env_names::CODERUNNER_PIDS_LIMIT,
                get(env_names::CODERUNNER_PIDS_LIMIT),
                defaults.pids_limit,
            )?,
            max_output_bytes: parse(
                env_names::CODERUNNER_MAX_OUTPUT_BYTES,
                get(env_names::CODERUNNER_MAX_OUTPUT_BYTES),
                defaults.max_output_bytes,
            )?,
            stop_grace_secs: parse(
                env_names::CODERUNNER_STOP_GRACE_SECS,
                get(env_names::CODERUNNER_STOP_GRACE_SECS),
                defaults.stop_grace_secs,
            )?,
            staging_dir: get(env_names::CODERUNNER_STAGING_DIR).map(PathBuf::from),
            reap_interval_minutes: parse(
                env_names::CODERUNNER_REAP_INTERVAL_MINUTES,
                get(env_names::CODERUNNER_REAP_INTERVAL_MINUTES),
                defaults.reap_interval_minutes,
            )?,
            reap_max_age_minutes: parse(
                env_names::CODERUNNER_REAP_MAX_AGE_MINUTES,
                get(env_names::CODERUNNER_REAP_MAX_AGE_MINUTES),
                defaults.reap_max_age_minutes,
            )?,
        };

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        check(
            env_names::CODERUNNER_MEMORY_MB,
            self.memory_mb,
            (6..=65_536).contains(&self.memory_mb),
        )?;
        check(
            env_names::CODERUNNER_CPU_FRACTION,
            self.cpu_fraction,
            self.cpu_fraction > 0.0 && self.cpu_fraction <= 64.0,
        )?;
        check(env_names::CODERUNNER_PIDS_LIMIT, self.pids_limit, self.pids_limit > 0)?;
        check(
            env_names::CODERUNNER_MAX_OUTPUT_BYTES,
            self.max_output_bytes,
            self.max_output_bytes > 0,
        )?;
        check(
            env_names::CODERUNNER_STOP_GRACE_SECS,
            self.stop_grace_secs,
            self.stop_grace_secs <= 30,
        )?;
        check(
            env_names::CODERUNNER_REAP_INTERVAL_MINUTES,
            self.reap_interval_minutes,
            (1..=60).contains(&self.reap_interval_minutes),
        )?;
        check(
            env_names::CODERUNNER_REAP_MAX_AGE_MINUTES,
            self.reap_max_age_minutes,
            (1..=MAX_REAP_MAX_AGE_MINUTES).contains(&self.reap_max_age_minutes),
        )?;
        check(
            env_names::CODERUNNER_MOUNT_PATH,
            &self.mount_path,
            self.mount_path.starts_with('/'),
        )?;
        Ok(())
    }

    pub fn resource_limits(&self) -> ResourceLimits {
        ResourceLimits {
            memory_mb: self.memory_mb,
            cpu_fraction: self.cpu_fraction,
            pids_limit: Some(self.pids_limit),
        }
    }

    pub fn reap_interval(&self) -> Duration {
        minutes(self.reap_interval_minutes)
    }

    pub fn reap_max_age(&self) -> Duration {
        minutes(self.reap_max_age_minutes)
    }
}

/// Minute count as a duration, saturating instead of overflowing
pub fn minutes(count: u64) -> Duration {
    Duration::from_secs(count.saturating_mul(60))
}

fn parse<T: FromStr>(
    name: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        Some(value) => {
            let parsed = value.trim().parse::<T>();
            parsed.map_err(|_| ConfigError::InvalidValue { name, value })
        }
        None => Ok(default),
    }
}

fn check<V: ToString>(name: &'static str, value: V, ok: bool) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            name,
            value: value.to_string(),
        })
    }
}
