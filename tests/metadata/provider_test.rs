//! Metadata decoding against a mock stay_open worker.

#![cfg(unix)]

#[path = "../support/mod.rs"]
mod support;

use std::sync::Arc;

use serde_json::Value;
use stayopen::metadata::{MetadataProvider, RecordExt, WorkerMetadataProvider};
use stayopen::worker::WorkerError;
use support::MockWorker;

#[tokio::test]
async fn test_get_metadata_preserves_file_order() {
    let mock = MockWorker::new();
    let client = mock.spawn().await;

    let records = client.get_metadata(&["a.jpg", "b.jpg"]).await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].source_file(), Some("a.jpg"));
    assert_eq!(records[1].source_file(), Some("b.jpg"));

    // Later frames begin with the newline after the previous ready token.
    let records = client.get_metadata(&["c.jpg"]).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].source_file(), Some("c.jpg"));

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_decode_failure_keeps_raw_text() {
    let mock = MockWorker::new();
    let client = mock.spawn().await;

    let err = client.get_metadata(&["corrupt.jpg"]).await.unwrap_err();
    match &err {
        WorkerError::Decode { raw, .. } => {
            assert!(raw.contains("garbage output for corrupt.jpg"));
        }
        other => panic!("expected decode error, got {other:?}"),
    }
    assert!(!err.is_fatal());

    // The frame was consumed whole, so the session carries on.
    let records = client.get_metadata(&["a.jpg"]).await.unwrap();
    assert_eq!(records[0].source_file(), Some("a.jpg"));

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_worker_errors_surface_as_decode_failure_in_json_mode() {
    let mock = MockWorker::new();
    let client = mock.spawn().await;

    let err = client
        .get_metadata(&["a.jpg", "missing.jpg"])
        .await
        .unwrap_err();
    match err {
        WorkerError::Decode { raw, .. } => {
            assert!(raw.contains("Error: File not found - missing.jpg"));
        }
        other => panic!("expected decode error, got {other:?}"),
    }

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_provider_sends_extra_flags() {
    let mock = MockWorker::new();
    let provider = WorkerMetadataProvider::with_client(mock.spawn().await).with_args(["-n", "-G"]);
    assert_eq!(provider.args(), ["-n", "-G"]);

    let records = provider
        .get_metadata(&["a.jpg".to_string(), "b.jpg".to_string()])
        .await
        .unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["Flags"], Value::from("-n -G"));
    assert_eq!(records[1].get_string("Flags"), Some("-n -G".to_string()));

    provider.client().close().await.unwrap();
}

#[tokio::test]
async fn test_get_file_metadata() {
    let mock = MockWorker::new();
    let provider = WorkerMetadataProvider::new(Arc::new(mock.spawn().await));

    let record = provider.get_file_metadata("single.jpg").await.unwrap();
    assert_eq!(
        record.as_ref().and_then(|r| r.source_file()),
        Some("single.jpg")
    );

    provider.client().close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_metadata_batches() {
    let mock = MockWorker::new();
    let provider = WorkerMetadataProvider::with_client(mock.spawn().await);

    let batches = vec![
        vec!["a.jpg".to_string(), "b.jpg".to_string()],
        vec!["c.jpg".to_string()],
        vec!["d.jpg".to_string(), "e.jpg".to_string(), "f.jpg".to_string()],
    ];

    let results = provider.get_metadata_batches(&batches).await.unwrap();
    assert_eq!(results.len(), 3);
    for (batch, records) in batches.iter().zip(&results) {
        let sources: Vec<_> = records.iter().filter_map(|r| r.source_file()).collect();
        assert_eq!(sources, *batch);
    }

    provider.client().close().await.unwrap();
}
