//! Worker-specific error types.

use std::io;
use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;

/// Result type for worker operations.
pub type WorkerResult<T> = Result<T, WorkerError>;

/// Errors that can occur while talking to the worker process.
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Failed to spawn the worker process or capture its input pipe.
    #[error("failed to spawn worker process: {0}")]
    SpawnFailed(#[source] io::Error),

    /// The worker could not be configured from settings.
    #[error("invalid worker configuration: {0}")]
    Config(#[from] crate::config::SettingsError),

    /// Failed to write a directive to worker stdin.
    #[error("failed to write to worker: {0}")]
    WriteFailed(#[source] io::Error),

    /// Failed to read from the merged worker output.
    #[error("failed to read from worker: {0}")]
    ReadFailed(#[source] io::Error),

    /// Failed to wait for the worker process to exit.
    #[error("failed to wait for worker exit: {0}")]
    WaitFailed(#[source] io::Error),

    /// The worker exited with a failure status.
    #[error("worker exited with {0}")]
    Exited(ExitStatus),

    /// A directive would break line framing.
    #[error("invalid directive {0:?}: directives must not contain line breaks")]
    InvalidDirective(String),

    /// The output stream ended (or misbehaved) before a ready token arrived.
    #[error("protocol desync: {0}")]
    ProtocolDesync(String),

    /// A frame grew past the configured ceiling without a ready token.
    #[error("response frame exceeds {limit} bytes without a ready token")]
    OversizedFrame {
        /// Configured ceiling in bytes.
        limit: usize,
    },

    /// The `-json` payload did not parse as an array of objects.
    #[error("failed to decode worker output ({raw:?}): {source}")]
    Decode {
        /// The frame text that failed to parse.
        raw: String,
        #[source]
        source: serde_json::Error,
    },

    /// An exchange did not complete in time.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// An earlier failure left the session in an unknown protocol state.
    #[error("worker session is poisoned: {0}")]
    Poisoned(String),

    /// The session has been shut down.
    #[error("worker session is closed")]
    Closed,

    /// One or more shutdown steps failed. Every step was still attempted.
    #[error("worker shutdown failed: {}", join_errors(.0))]
    Shutdown(Vec<WorkerError>),
}

fn join_errors(errors: &[WorkerError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl WorkerError {
    /// Create a desync error.
    pub fn desync(message: impl Into<String>) -> Self {
        Self::ProtocolDesync(message.into())
    }

    /// Check if this error leaves the session unusable.
    ///
    /// Decode failures are not fatal: the frame was consumed in full, so the
    /// next exchange starts on a clean boundary. Invalid directives are
    /// rejected before anything is written.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Decode { .. } | Self::InvalidDirective(_))
    }

    /// Check if this error was caused by the worker going away.
    pub fn is_worker_exited(&self) -> bool {
        match self {
            Self::ProtocolDesync(_) | Self::Exited(_) => true,
            Self::WriteFailed(e) | Self::ReadFailed(e) => {
                matches!(
                    e.kind(),
                    io::ErrorKind::BrokenPipe | io::ErrorKind::UnexpectedEof
                )
            }
            _ => false,
        }
    }
}
