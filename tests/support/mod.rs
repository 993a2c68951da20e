//! Shared mock worker for integration tests.
//!
//! The mock is a POSIX shell script run through `/bin/sh` so the test binary
//! never executes a file it just wrote.

#![allow(dead_code)]

use std::path::PathBuf;
use std::time::Duration;

use stayopen::worker::{SessionOptions, WorkerClient};
use tempfile::TempDir;

const MOCK_WORKER: &str = include_str!("mock_worker.sh");

/// A mock worker script living in a temporary directory.
pub struct MockWorker {
    _dir: TempDir,
    script: PathBuf,
}

impl MockWorker {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let script = dir.path().join("mock_worker.sh");
        std::fs::write(&script, MOCK_WORKER).expect("write mock worker");
        Self { _dir: dir, script }
    }

    /// Session options that launch the mock in place of exiftool.
    pub fn options(&self) -> SessionOptions {
        SessionOptions::new("/bin/sh").with_args([self.script.to_string_lossy().into_owned()])
    }

    /// Spawn a client with a generous request timeout.
    pub async fn spawn(&self) -> WorkerClient {
        self.spawn_with(self.options(), Some(Duration::from_secs(10)))
            .await
    }

    pub async fn spawn_with(
        &self,
        options: SessionOptions,
        timeout: Option<Duration>,
    ) -> WorkerClient {
        WorkerClient::spawn_with_options(options, timeout)
            .await
            .expect("spawn mock worker")
    }
}

/// Non-empty lines of a frame.
pub fn lines(raw: &str) -> Vec<&str> {
    raw.lines().filter(|l| !l.is_empty()).collect()
}
