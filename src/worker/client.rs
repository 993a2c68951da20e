//! Async client for a persistent `-stay_open` worker process.

use std::path::Path;
use std::time::Duration;

use tokio::sync::Mutex;

use super::error::{WorkerError, WorkerResult};
use super::protocol::{self, Response};
use super::session::{Session, SessionOptions, SessionState};
use crate::config::Settings;
use crate::metadata::{decode_records, Record};

/// Default timeout for one exchange (30 seconds).
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Async client for one long-lived worker.
///
/// The worker is spawned once in `-stay_open` mode and every query is written
/// to its stdin as argument lines followed by `-execute`. The protocol has no
/// request IDs, so a single lock is held from the first directive written to
/// the last byte of the response read. Concurrent callers queue on that lock
/// in arrival order.
///
/// # Example
///
/// ```ignore
/// use stayopen::worker::WorkerClient;
///
/// let client = WorkerClient::spawn("exiftool").await?;
///
/// let response = client.execute(&["-ver"]).await?;
/// println!("{}", response.raw.trim());
///
/// let records = client.get_metadata(&["a.jpg", "b.jpg"]).await?;
///
/// client.close().await?;
/// ```
pub struct WorkerClient {
    /// The worker session; the lock spans one whole exchange.
    session: Mutex<Session>,

    /// Request timeout duration (`None` waits forever).
    timeout: Option<Duration>,
}

impl WorkerClient {
    /// Spawn a new worker process.
    ///
    /// # Arguments
    ///
    /// * `worker_path` - Path to the worker binary.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker process cannot be spawned.
    pub async fn spawn<P: AsRef<Path>>(worker_path: P) -> WorkerResult<Self> {
        Self::spawn_with_timeout(worker_path, Duration::from_secs(DEFAULT_TIMEOUT_SECS)).await
    }

    /// Spawn a new worker process with a custom request timeout.
    pub async fn spawn_with_timeout<P: AsRef<Path>>(
        worker_path: P,
        timeout: Duration,
    ) -> WorkerResult<Self> {
        Self::spawn_with_options(SessionOptions::new(worker_path.as_ref()), Some(timeout)).await
    }

    /// Spawn a worker with extra startup arguments.
    pub async fn spawn_with_args<P: AsRef<Path>>(
        worker_path: P,
        args: &[String],
    ) -> WorkerResult<Self> {
        let options = SessionOptions::new(worker_path.as_ref()).with_args(args.iter().cloned());
        Self::spawn_with_options(options, Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS))).await
    }

    /// Spawn a worker using settings configuration.
    pub async fn spawn_with_settings(settings: &Settings) -> WorkerResult<Self> {
        let options = settings.session_options()?;
        Self::spawn_with_options(options, settings.request_timeout()).await
    }

    /// Spawn a worker from explicit session options.
    pub async fn spawn_with_options(
        options: SessionOptions,
        timeout: Option<Duration>,
    ) -> WorkerResult<Self> {
        let session = Session::start(&options)?;

        Ok(Self {
            session: Mutex::new(session),
            timeout,
        })
    }

    /// Run one query and classify its response.
    ///
    /// Lines the worker marks as warnings or errors are returned in the
    /// [`Response`]; only transport failures are reported as `Err`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A directive contains a line break
    /// - The session is poisoned or closed
    /// - Writing to or reading from the worker fails
    /// - The worker output ends before the ready token
    /// - The response exceeds the frame ceiling
    /// - The request times out
    pub async fn execute<S: AsRef<str> + Sync>(
        &self,
        directives: &[S],
    ) -> WorkerResult<Response> {
        let frame = self.exchange(directives).await?;
        let raw = match String::from_utf8(frame) {
            Ok(text) => text,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        };
        Ok(Response::parse(raw))
    }

    async fn exchange<S: AsRef<str> + Sync>(&self, directives: &[S]) -> WorkerResult<Vec<u8>> {
        for directive in directives {
            let directive = directive.as_ref();
            if directive.contains(['\n', '\r']) {
                return Err(WorkerError::InvalidDirective(directive.to_string()));
            }
        }

        let mut session = self.session.lock().await;
        session.ensure_ready()?;

        let result = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, session.round_trip(directives))
                .await
                .unwrap_or(Err(WorkerError::Timeout(limit))),
            None => session.round_trip(directives).await,
        };

        // A half-finished exchange leaves unread output or unexecuted lines
        // behind, so nothing after it can be trusted.
        if let Err(e) = &result {
            if e.is_fatal() {
                session.poison(e.to_string());
            }
        }

        result
    }

    /// Shut the worker down.
    ///
    /// Sends the stay_open shutdown directives, closes both pipes and waits
    /// for the process to exit. Waits for any in-flight query first. Every
    /// step is attempted; failures are collected into
    /// [`WorkerError::Shutdown`].
    ///
    /// This is the client's final call: afterwards every method returns
    /// [`WorkerError::Closed`].
    pub async fn close(&self) -> WorkerResult<()> {
        let mut session = self.session.lock().await;
        session.shutdown().await
    }

    /// Current session state.
    pub async fn state(&self) -> SessionState {
        self.session.lock().await.state().clone()
    }

    /// Check if the session can still take queries.
    pub async fn is_alive(&self) -> bool {
        self.state().await == SessionState::Ready
    }

    /// Get the current request timeout.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Set the request timeout.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }
}

// Convenience methods for common operations
impl WorkerClient {
    /// Extract metadata for `files` as one record per file, in input order.
    ///
    /// Equivalent to executing `-json` followed by the file paths. Per-file
    /// failures are left in the records (or their absence) for the caller.
    pub async fn get_metadata<S: AsRef<str> + Sync>(
        &self,
        files: &[S],
    ) -> WorkerResult<Vec<Record>> {
        self.get_metadata_with_args(&[] as &[&str], files).await
    }

    /// Like [`get_metadata`](Self::get_metadata) with extra flags placed
    /// between `-json` and the file list.
    pub async fn get_metadata_with_args<A, S>(
        &self,
        args: &[A],
        files: &[S],
    ) -> WorkerResult<Vec<Record>>
    where
        A: AsRef<str> + Sync,
        S: AsRef<str> + Sync,
    {
        let directives: Vec<&str> = std::iter::once(protocol::JSON)
            .chain(args.iter().map(|arg| arg.as_ref()))
            .chain(files.iter().map(|file| file.as_ref()))
            .collect();

        let response = self.execute(&directives).await?;
        decode_records(&response.raw)
    }

    /// Version string reported by the worker.
    pub async fn version(&self) -> WorkerResult<String> {
        let response = self.execute(&["-ver"]).await?;
        Ok(response.raw.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_is_send_sync() {
        fn _assert_send_sync<T: Send + Sync>() {}
        _assert_send_sync::<WorkerClient>();
    }

    #[tokio::test]
    async fn test_spawn_missing_binary() {
        let result = WorkerClient::spawn("/nonexistent/definitely-not-exiftool").await;
        assert!(matches!(result, Err(WorkerError::SpawnFailed(_))));
    }
}
