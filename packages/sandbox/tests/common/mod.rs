// ABOUTME: In-memory container engine used by executor integration tests
// ABOUTME: Interprets a tiny line-based program format instead of running real containers

use async_trait::async_trait;
use coderunner_sandbox::{
    CapturedOutput, ContainerConfig, ContainerEngine, ContainerInfo, EngineError, StreamType,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub const IMAGE: &str = "python-executor:latest";

/// What a fake program does once started
#[derive(Debug, Clone, Default)]
struct Behavior {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    sleep: Duration,
    exit_code: i64,
}

#[derive(Debug, Clone)]
struct FakeContainer {
    config: ContainerConfig,
    behavior: Behavior,
    state: &'static str,
    created: i64,
}

/// Engine that "runs" staged sources written in a line format:
///
/// - `print <text>`  writes `<text>\n` to stdout
/// - `write <text>`  writes `<text>` to stdout
/// - `warn <text>`   writes `<text>\n` to stderr
/// - `sleep <secs>`  runs for that many seconds
/// - `exit <code>`   exits with that code
/// - `echo-stdin`    copies stdin to stdout, or fails with EOF when none is attached
#[derive(Default)]
pub struct FakeEngine {
    containers: Mutex<HashMap<String, FakeContainer>>,
    mounted_dirs: Mutex<Vec<PathBuf>>,
    next_id: AtomicUsize,
    create_delay: Duration,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold every create call open for `delay` after the container exists
    pub fn with_create_delay(mut self, delay: Duration) -> Self {
        self.create_delay = delay;
        self
    }

    /// Host directories bound into every container created so far
    pub fn mounted_dirs(&self) -> Vec<PathBuf> {
        self.mounted_dirs.lock().unwrap().clone()
    }

    pub fn container_count(&self) -> usize {
        self.containers.lock().unwrap().len()
    }

    fn interpret(config: &ContainerConfig) -> std::io::Result<Behavior> {
        let host_dir = PathBuf::from(&config.volumes[0].host_path);
        let source = std::fs::read_to_string(host_dir.join("user_code.py"))?;
        let stdin = if config.command.iter().any(|a| a.ends_with("/input.txt")) {
            Some(std::fs::read_to_string(host_dir.join("input.txt"))?)
        } else {
            None
        };

        let mut behavior = Behavior::default();
        for line in source.lines() {
            let (op, arg) = line.split_once(' ').unwrap_or((line, ""));
            match op {
                "print" => {
                    behavior.stdout.extend_from_slice(arg.as_bytes());
                    behavior.stdout.push(b'\n');
                }
                "write" => behavior.stdout.extend_from_slice(arg.as_bytes()),
                "warn" => {
                    behavior.stderr.extend_from_slice(arg.as_bytes());
                    behavior.stderr.push(b'\n');
                }
                "sleep" => behavior.sleep = Duration::from_secs(arg.parse().unwrap_or(0)),
                "exit" => behavior.exit_code = arg.parse().unwrap_or(1),
                "echo-stdin" => match &stdin {
                    Some(input) => behavior.stdout.extend_from_slice(input.as_bytes()),
                    None => {
                        behavior
                            .stderr
                            .extend_from_slice(b"EOFError: EOF when reading a line\n");
                        behavior.exit_code = 1;
                        break;
                    }
                },
                _ => {}
            }
        }
        Ok(behavior)
    }

    fn behavior(&self, id: &str) -> Result<Behavior, EngineError> {
        self.containers
            .lock()
            .unwrap()
            .get(id)
            .map(|c| c.behavior.clone())
            .ok_or_else(|| EngineError::NotFound(id.to_string()))
    }

    fn set_state(&self, id: &str, state: &'static str) -> Result<(), EngineError> {
        let mut containers = self.containers.lock().unwrap();
        let container = containers
            .get_mut(id)
            .ok_or_else(|| EngineError::NotFound(id.to_string()))?;
        container.state = state;
        Ok(())
    }
}

#[async_trait]
impl ContainerEngine for FakeEngine {
    async fn ping(&self) -> Result<(), EngineError> {
        Ok(())
    }

    async fn image_exists(&self, image: &str) -> Result<bool, EngineError> {
        Ok(image == IMAGE)
    }

    async fn create_container(&self, config: &ContainerConfig) -> Result<String, EngineError> {
        let behavior =
            Self::interpret(config).map_err(|e| EngineError::ContainerError(e.to_string()))?;
        let id = format!("fake-{}", self.next_id.fetch_add(1, Ordering::SeqCst));

        self.mounted_dirs
            .lock()
            .unwrap()
            .push(PathBuf::from(&config.volumes[0].host_path));
        self.containers.lock().unwrap().insert(
            id.clone(),
            FakeContainer {
                config: config.clone(),
                behavior,
                state: "created",
                created: chrono::Utc::now().timestamp(),
            },
        );
        tokio::time::sleep(self.create_delay).await;
        Ok(id)
    }

    async fn start_container(&self, container_id: &str) -> Result<(), EngineError> {
        self.set_state(container_id, "running")
    }

    async fn wait_container(&self, container_id: &str) -> Result<i64, EngineError> {
        let behavior = self.behavior(container_id)?;
        tokio::time::sleep(behavior.sleep).await;
        self.set_state(container_id, "exited")?;
        Ok(behavior.exit_code)
    }

    async fn read_logs(
        &self,
        container_id: &str,
        max_bytes: usize,
    ) -> Result<CapturedOutput, EngineError> {
        let behavior = self.behavior(container_id)?;
        let mut output = CapturedOutput::default();
        output.push(StreamType::Stdout, &behavior.stdout, max_bytes);
        output.push(StreamType::Stderr, &behavior.stderr, max_bytes);
        Ok(output)
    }

    async fn stop_container(&self, container_id: &str, _grace_secs: u64) -> Result<(), EngineError> {
        self.set_state(container_id, "exited")
    }

    async fn remove_container(&self, container_id: &str, _force: bool) -> Result<(), EngineError> {
        self.containers.lock().unwrap().remove(container_id);
        Ok(())
    }

    async fn list_containers(
        &self,
        labels: &[String],
        include_stopped: bool,
    ) -> Result<Vec<ContainerInfo>, EngineError> {
        let containers = self.containers.lock().unwrap();
        Ok(containers
            .iter()
            .filter(|(_, c)| include_stopped || c.state == "running")
            .filter(|(_, c)| {
                labels.iter().all(|label| {
                    let (key, value) = label.split_once('=').unwrap_or((label, ""));
                    c.config.labels.get(key).map(String::as_str) == Some(value)
                })
            })
            .map(|(id, c)| ContainerInfo {
                id: id.clone(),
                name: c.config.name.clone(),
                image: c.config.image.clone(),
                state: c.state.to_string(),
                status: c.state.to_string(),
                created: c.created,
                labels: c.config.labels.clone(),
            })
            .collect())
    }
}
