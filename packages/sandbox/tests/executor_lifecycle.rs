// ABOUTME: End-to-end executor lifecycle tests against the in-memory engine
// ABOUTME: Covers classification, stdin handling, timeouts, cleanup and concurrent isolation

mod common;

use coderunner_sandbox::{
    ExecutionRequest, ExecutionStatus, ExecutorSettings, RuntimeGateway, SandboxExecutor,
};
use common::{FakeEngine, IMAGE};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

async fn setup() -> (Arc<FakeEngine>, SandboxExecutor) {
    let engine = Arc::new(FakeEngine::new());
    let gateway = RuntimeGateway::initialize(engine.clone(), IMAGE)
        .await
        .unwrap();
    let executor = SandboxExecutor::new(Arc::new(gateway), ExecutorSettings::default());
    (engine, executor)
}

#[tokio::test]
async fn test_hello_world_succeeds() {
    let (_engine, executor) = setup().await;

    let result = executor.run("print Hello, World!", "", 5).await;

    assert_eq!(result.status, ExecutionStatus::Success);
    assert_eq!(result.output, "Hello, World!\n");
    assert_eq!(result.error, "");
    assert_eq!(result.exit_code, Some(0));
}

#[tokio::test]
async fn test_failing_program_reports_stderr() {
    let (_engine, executor) = setup().await;

    let code = "print partial\nwarn ZeroDivisionError: division by zero\nexit 1";
    let result = executor.run(code, "", 5).await;

    assert_eq!(result.status, ExecutionStatus::Error);
    assert_eq!(result.output, "partial\n");
    assert!(result.error.contains("ZeroDivisionError"));
    assert_eq!(result.exit_code, Some(1));
}

#[tokio::test]
async fn test_silent_nonzero_exit_names_the_code() {
    let (_engine, executor) = setup().await;

    let result = executor.run("exit 3", "", 5).await;

    assert_eq!(result.status, ExecutionStatus::Error);
    assert_eq!(result.error, "Process exited with code 3");
    assert_eq!(result.exit_code, Some(3));
}

#[tokio::test(start_paused = true)]
async fn test_timeout_is_reported_at_the_limit() {
    let (engine, executor) = setup().await;

    let result = executor.run("print never\nsleep 10", "", 2).await;

    assert_eq!(result.status, ExecutionStatus::Timeout);
    assert_eq!(result.execution_time_seconds, 2.0);
    assert_eq!(result.error, "Execution timed out after 2 seconds");
    assert_eq!(result.output, "");
    assert_eq!(result.exit_code, None);
    assert_eq!(engine.container_count(), 0);

    let dirs = engine.mounted_dirs();
    assert_eq!(dirs.len(), 1);
    for dir in dirs {
        assert!(!dir.exists(), "staged dir {} was left behind", dir.display());
    }
}

#[tokio::test]
async fn test_stdin_is_delivered() {
    let (_engine, executor) = setup().await;

    let result = executor.run("echo-stdin", "42\n", 5).await;

    assert_eq!(result.status, ExecutionStatus::Success);
    assert_eq!(result.output, "42\n");
}

#[tokio::test]
async fn test_missing_stdin_reads_eof() {
    let (_engine, executor) = setup().await;

    let result = executor.run("echo-stdin", "", 5).await;

    assert_eq!(result.status, ExecutionStatus::Error);
    assert!(result.error.contains("EOFError"));
}

#[tokio::test]
async fn test_no_sandbox_or_staged_files_remain() {
    let (engine, executor) = setup().await;

    executor.run("print ok", "", 5).await;
    executor.run("exit 1", "", 5).await;
    executor.run("echo-stdin", "data", 5).await;

    assert_eq!(engine.container_count(), 0);
    assert!(executor
        .gateway()
        .list_sandboxes(None)
        .await
        .unwrap()
        .is_empty());

    let dirs = engine.mounted_dirs();
    assert_eq!(dirs.len(), 3);
    for dir in dirs {
        assert!(!dir.exists(), "staged dir {} was left behind", dir.display());
    }
}

#[tokio::test]
async fn test_invalid_requests_are_rejected() {
    let (engine, executor) = setup().await;

    let too_long = executor.run("print x", "", 31).await;
    let too_large = executor.run(&"x".repeat(64 * 1024 + 1), "", 5).await;

    assert_eq!(too_long.status, ExecutionStatus::Error);
    assert!(too_long.error.starts_with("Invalid request:"));
    assert_eq!(too_large.status, ExecutionStatus::Error);
    assert!(engine.mounted_dirs().is_empty());
}

#[tokio::test]
async fn test_concurrent_jobs_are_isolated() {
    let (engine, executor) = setup().await;
    let executor = Arc::new(executor);

    let jobs = (0..8).map(|i| {
        let executor = Arc::clone(&executor);
        async move {
            let code = format!("print job {}\necho-stdin", i);
            let stdin = format!("input {}\n", i);
            (i, executor.run(&code, &stdin, 5).await)
        }
    });

    let results = futures::future::join_all(jobs).await;

    for (i, result) in results {
        assert_eq!(result.status, ExecutionStatus::Success);
        assert_eq!(result.output, format!("job {}\ninput {}\n", i, i));
    }

    let dirs = engine.mounted_dirs();
    let mut unique = dirs.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), 8);
    assert_eq!(engine.container_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_job_still_removes_sandbox() {
    let (engine, executor) = setup().await;

    let request = ExecutionRequest::new("sleep 20", "", 30).unwrap();
    let cancelled =
        tokio::time::timeout(Duration::from_secs(1), executor.execute(&request)).await;
    assert!(cancelled.is_err());

    // Let the deferred removal run
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(engine.container_count(), 0);
    for dir in engine.mounted_dirs() {
        assert!(!dir.exists());
    }
}

#[tokio::test(start_paused = true)]
async fn test_job_cancelled_during_create_removes_sandbox() {
    let engine = Arc::new(FakeEngine::new().with_create_delay(Duration::from_secs(5)));
    let gateway = RuntimeGateway::initialize(engine.clone(), IMAGE)
        .await
        .unwrap();
    let executor = SandboxExecutor::new(Arc::new(gateway), ExecutorSettings::default());

    let request = ExecutionRequest::new("print never", "", 10).unwrap();
    let cancelled =
        tokio::time::timeout(Duration::from_secs(1), executor.execute(&request)).await;
    assert!(cancelled.is_err());
    assert_eq!(engine.mounted_dirs().len(), 1);

    // Let the deferred removal run
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(engine.container_count(), 0);
}

#[tokio::test]
async fn test_readiness_with_image_present() {
    let (_engine, executor) = setup().await;
    assert!(executor.is_ready().await);
}

#[tokio::test]
async fn test_missing_image_fails_initialization() {
    let engine = Arc::new(FakeEngine::new());

    let err = match RuntimeGateway::initialize(engine, "other:latest").await {
        Ok(_) => panic!("initialization should fail without the image"),
        Err(e) => e,
    };

    assert!(err.to_string().contains("other:latest"));
    assert!(err.to_string().contains("docker build"));
}
