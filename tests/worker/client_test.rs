//! WorkerClient tests against a mock stay_open worker.

#![cfg(unix)]

#[path = "../support/mod.rs"]
mod support;

use std::sync::Arc;
use std::time::Duration;

use stayopen::worker::{SessionState, WorkerClient, WorkerError};
use support::{lines, MockWorker};

#[tokio::test]
async fn test_execute_round_trip() {
    let mock = MockWorker::new();
    let client = mock.spawn().await;

    let response = client.execute(&["-s", "photo.jpg"]).await.unwrap();
    assert_eq!(lines(&response.raw), vec!["echo: -s", "echo: photo.jpg"]);
    assert!(response.warnings.is_empty());
    assert!(response.errors.is_empty());

    // The second frame starts right after the previous ready token.
    let response = client.execute(&["again"]).await.unwrap();
    assert_eq!(lines(&response.raw), vec!["echo: again"]);

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_empty_query() {
    let mock = MockWorker::new();
    let client = mock.spawn().await;

    let response = client.execute(&[] as &[&str]).await.unwrap();
    assert!(lines(&response.raw).is_empty());

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_stderr_is_merged_into_the_frame() {
    let mock = MockWorker::new();
    let client = mock.spawn().await;

    let response = client
        .execute(&["before", "-warn", "middle", "-err", "after"])
        .await
        .unwrap();

    assert_eq!(
        lines(&response.raw),
        vec![
            "echo: before",
            "Warning: low battery",
            "echo: middle",
            "Error: file not found",
            "echo: after",
        ]
    );
    assert_eq!(response.warnings, vec!["low battery"]);
    assert_eq!(response.errors, vec!["file not found"]);

    // Reported errors do not disturb the session.
    assert!(client.is_alive().await);
    assert_eq!(client.version().await.unwrap(), "12.76");

    client.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_callers_are_serialized() {
    let mock = MockWorker::new();
    let client = Arc::new(mock.spawn().await);

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let client = Arc::clone(&client);
            tokio::spawn(async move {
                let directives = vec![format!("task-{i}"), format!("payload-{i}")];
                let response = client.execute(&directives).await.unwrap();
                (i, response)
            })
        })
        .collect();

    for task in tasks {
        let (i, response) = task.await.unwrap();
        assert_eq!(
            lines(&response.raw),
            vec![format!("echo: task-{i}"), format!("echo: payload-{i}")]
        );
    }

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_worker_death_poisons_session() {
    let mock = MockWorker::new();
    let client = mock.spawn().await;

    let err = client.execute(&["-die"]).await.unwrap_err();
    assert!(matches!(err, WorkerError::ProtocolDesync(_)), "got {err:?}");
    assert!(err.is_worker_exited());

    assert!(matches!(client.state().await, SessionState::Poisoned(_)));
    assert!(matches!(
        client.execute(&["hello"]).await,
        Err(WorkerError::Poisoned(_))
    ));

    // Shutdown still closes the pipes and reaps the process.
    match client.close().await {
        Err(WorkerError::Shutdown(errors)) => {
            assert!(errors.iter().any(|e| matches!(e, WorkerError::Exited(_))));
        }
        other => panic!("expected aggregated shutdown error, got {other:?}"),
    }
    assert_eq!(client.state().await, SessionState::Closed);
}

#[tokio::test]
async fn test_oversized_frame_is_rejected() {
    let mock = MockWorker::new();
    let client = mock
        .spawn_with(mock.options().with_max_frame(64), Some(Duration::from_secs(10)))
        .await;

    let long = "x".repeat(200);
    let err = client.execute(&[long.as_str()]).await.unwrap_err();
    assert!(matches!(err, WorkerError::OversizedFrame { limit: 64 }));
    assert!(matches!(client.state().await, SessionState::Poisoned(_)));
}

#[tokio::test]
async fn test_timeout_poisons_session() {
    let mock = MockWorker::new();
    let options = mock
        .options()
        .with_shutdown_timeout(Duration::from_millis(500));
    let client = mock
        .spawn_with(options, Some(Duration::from_millis(200)))
        .await;

    let err = client.execute(&["-sleep"]).await.unwrap_err();
    assert!(matches!(err, WorkerError::Timeout(d) if d == Duration::from_millis(200)));
    assert!(matches!(
        client.execute(&["hello"]).await,
        Err(WorkerError::Poisoned(_))
    ));

    // The worker is still sleeping, so shutdown has to kill it.
    match client.close().await {
        Err(WorkerError::Shutdown(errors)) => {
            assert!(errors.iter().any(|e| matches!(e, WorkerError::Timeout(_))));
        }
        other => panic!("expected aggregated shutdown error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_invalid_directive_is_rejected_before_writing() {
    let mock = MockWorker::new();
    let client = mock.spawn().await;

    let err = client.execute(&["a.jpg\n-execute"]).await.unwrap_err();
    assert!(matches!(err, WorkerError::InvalidDirective(_)));
    assert!(!err.is_fatal());

    let response = client.execute(&["ok"]).await.unwrap();
    assert_eq!(lines(&response.raw), vec!["echo: ok"]);

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_close_is_final() {
    let mock = MockWorker::new();
    let client = mock.spawn().await;

    client.close().await.unwrap();
    assert!(!client.is_alive().await);
    assert!(matches!(client.execute(&["hello"]).await, Err(WorkerError::Closed)));
    assert!(matches!(client.close().await, Err(WorkerError::Closed)));
}

#[tokio::test]
async fn test_spawn_missing_worker() {
    let result = WorkerClient::spawn("/nonexistent/exiftool").await;
    assert!(matches!(result, Err(WorkerError::SpawnFailed(_))));
}
