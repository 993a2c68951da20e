//! Lifecycle of one `-stay_open` worker process.
//!
//! The session bundles the child handle, its stdin and a single merged
//! stdout/stderr pipe. Both output streams are attached to the same OS pipe so
//! that a query's diagnostics arrive in the frame they belong to, in the order
//! the worker wrote them.

use std::io::{self, Read};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::mpsc;

use super::error::{WorkerError, WorkerResult};
use super::protocol::{self, DEFAULT_READY_TOKEN};
use super::splitter::FrameSplitter;

/// Default pre-allocated frame buffer (bytes).
pub const DEFAULT_INITIAL_BUFFER: usize = 64 * 1000;

/// Default frame ceiling (bytes).
pub const DEFAULT_MAX_FRAME: usize = 1024 * 1000;

/// Default grace period for the worker to exit on shutdown.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 5;

/// Size of a single read from the merged output pipe.
const READ_CHUNK: usize = 8 * 1024;

/// Chunks buffered between the reader thread and the session.
const OUTPUT_CHANNEL_DEPTH: usize = 64;

/// How to launch and frame one worker.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Worker binary.
    pub program: PathBuf,
    /// Extra arguments placed before the persistent-mode flags.
    pub args: Vec<String>,
    /// Token the worker prints after each executed command.
    pub ready_token: String,
    /// Pre-allocated frame buffer size.
    pub initial_buffer: usize,
    /// Largest frame accepted before failing with `OversizedFrame`.
    pub max_frame: usize,
    /// How long shutdown waits for the process before killing it.
    pub shutdown_timeout: Duration,
}

impl SessionOptions {
    /// Options for `program` with default framing.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            ready_token: DEFAULT_READY_TOKEN.to_string(),
            initial_buffer: DEFAULT_INITIAL_BUFFER,
            max_frame: DEFAULT_MAX_FRAME,
            shutdown_timeout: Duration::from_secs(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
        }
    }

    /// Add startup arguments.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Override the frame ceiling.
    pub fn with_max_frame(mut self, max_frame: usize) -> Self {
        self.max_frame = max_frame;
        self
    }

    /// Override the shutdown grace period.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

/// Where the session stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Ready for the next exchange.
    Ready,
    /// A transport failure left the protocol state unknown.
    Poisoned(String),
    /// Shut down.
    Closed,
}

/// One running worker and its pipes.
pub(crate) struct Session {
    child: Child,
    stdin: Option<BufWriter<ChildStdin>>,
    output: Option<mpsc::Receiver<io::Result<Vec<u8>>>>,
    splitter: FrameSplitter,
    eof: bool,
    state: SessionState,
    shutdown_timeout: Duration,
}

impl Session {
    /// Spawn the worker in persistent mode.
    pub(crate) fn start(options: &SessionOptions) -> WorkerResult<Self> {
        let (reader, writer) = io::pipe().map_err(WorkerError::SpawnFailed)?;
        let stderr = writer.try_clone().map_err(WorkerError::SpawnFailed)?;

        // The command owns our copies of the write end; dropping it at the end
        // of this block is what lets the reader see EOF once the worker exits.
        let mut child = {
            let mut command = Command::new(&options.program);
            command
                .args(&options.args)
                .args(protocol::startup_args())
                .stdin(Stdio::piped())
                .stdout(writer)
                .stderr(stderr)
                .kill_on_drop(true);
            command.spawn().map_err(WorkerError::SpawnFailed)?
        };

        let stdin = child.stdin.take().ok_or_else(|| {
            WorkerError::SpawnFailed(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "worker stdin was not captured",
            ))
        })?;

        let output = spawn_output_reader(reader).map_err(WorkerError::SpawnFailed)?;

        tracing::debug!(
            program = %options.program.display(),
            pid = child.id(),
            "spawned stay_open worker"
        );

        Ok(Self {
            child,
            stdin: Some(BufWriter::new(stdin)),
            output: Some(output),
            splitter: FrameSplitter::new(
                options.ready_token.as_bytes(),
                options.initial_buffer,
                options.max_frame,
            ),
            eof: false,
            state: SessionState::Ready,
            shutdown_timeout: options.shutdown_timeout,
        })
    }

    pub(crate) fn state(&self) -> &SessionState {
        &self.state
    }

    /// Fail fast unless the session can take another exchange.
    pub(crate) fn ensure_ready(&self) -> WorkerResult<()> {
        match &self.state {
            SessionState::Ready => Ok(()),
            SessionState::Poisoned(reason) => Err(WorkerError::Poisoned(reason.clone())),
            SessionState::Closed => Err(WorkerError::Closed),
        }
    }

    pub(crate) fn poison(&mut self, reason: String) {
        if self.state == SessionState::Ready {
            tracing::warn!(reason = reason.as_str(), "worker session poisoned");
            self.state = SessionState::Poisoned(reason);
        }
    }

    /// Write one directive line (buffered until the next flush).
    pub(crate) async fn write_line(&mut self, line: &str) -> WorkerResult<()> {
        let stdin = self.stdin.as_mut().ok_or(WorkerError::Closed)?;
        tracing::trace!(directive = line, "->");
        stdin
            .write_all(line.as_bytes())
            .await
            .map_err(WorkerError::WriteFailed)?;
        stdin.write_all(b"\n").await.map_err(WorkerError::WriteFailed)
    }

    pub(crate) async fn flush(&mut self) -> WorkerResult<()> {
        let stdin = self.stdin.as_mut().ok_or(WorkerError::Closed)?;
        stdin.flush().await.map_err(WorkerError::WriteFailed)
    }

    /// Write a full query, execute it and read its frame.
    pub(crate) async fn round_trip<S: AsRef<str> + Sync>(
        &mut self,
        directives: &[S],
    ) -> WorkerResult<Vec<u8>> {
        for directive in directives {
            self.write_line(directive.as_ref()).await?;
        }
        self.write_line(protocol::EXECUTE).await?;
        self.flush().await?;
        self.read_frame().await
    }

    /// Block until the next ready-token-delimited frame arrives.
    pub(crate) async fn read_frame(&mut self) -> WorkerResult<Vec<u8>> {
        loop {
            if let Some(frame) = self.splitter.next_frame(self.eof)? {
                tracing::trace!(bytes = frame.len(), "<- frame");
                return Ok(frame);
            }
            if self.eof {
                return Err(WorkerError::desync(
                    "worker output closed while waiting for a response",
                ));
            }

            let output = self.output.as_mut().ok_or(WorkerError::Closed)?;
            match output.recv().await {
                Some(Ok(chunk)) => self.splitter.feed(&chunk),
                Some(Err(e)) => return Err(WorkerError::ReadFailed(e)),
                None => self.eof = true,
            }
        }
    }

    /// Ask the worker to exit and release the process and both pipes.
    ///
    /// Every step is attempted even when an earlier one fails. This must be
    /// the last call on a session; later calls return `Closed`.
    pub(crate) async fn shutdown(&mut self) -> WorkerResult<()> {
        if self.state == SessionState::Closed {
            return Err(WorkerError::Closed);
        }
        self.state = SessionState::Closed;

        let mut errors = Vec::new();

        if let Err(e) = self.write_shutdown_directives().await {
            tracing::warn!(error = %e, "failed to send stay_open shutdown directives");
            errors.push(e);
        }

        // Dropping the receiver closes our side of the merged output.
        self.output.take();

        if let Some(mut stdin) = self.stdin.take() {
            if let Err(e) = stdin.shutdown().await {
                tracing::warn!(error = %e, "failed to close worker stdin");
                errors.push(WorkerError::WriteFailed(e));
            }
        }

        if let Err(e) = self.wait_for_exit().await {
            tracing::warn!(error = %e, "worker did not exit cleanly");
            errors.push(e);
        }

        tracing::debug!(failed_steps = errors.len(), "worker session shut down");

        if errors.is_empty() {
            Ok(())
        } else {
            Err(WorkerError::Shutdown(errors))
        }
    }

    async fn write_shutdown_directives(&mut self) -> WorkerResult<()> {
        for directive in protocol::shutdown_directives() {
            self.write_line(directive).await?;
        }
        self.flush().await
    }

    async fn wait_for_exit(&mut self) -> WorkerResult<()> {
        match tokio::time::timeout(self.shutdown_timeout, self.child.wait()).await {
            Ok(Ok(status)) if status.success() => Ok(()),
            Ok(Ok(status)) => Err(WorkerError::Exited(status)),
            Ok(Err(e)) => Err(WorkerError::WaitFailed(e)),
            Err(_) => {
                self.child.kill().await.map_err(WorkerError::WaitFailed)?;
                Err(WorkerError::Timeout(self.shutdown_timeout))
            }
        }
    }
}

/// Drain the merged output pipe on a dedicated thread.
///
/// The channel closes when the pipe reports EOF, which happens once the worker
/// (the last holder of the write end) has exited.
fn spawn_output_reader(
    mut reader: io::PipeReader,
) -> io::Result<mpsc::Receiver<io::Result<Vec<u8>>>> {
    let (tx, rx) = mpsc::channel(OUTPUT_CHANNEL_DEPTH);

    std::thread::Builder::new()
        .name("stayopen-output".to_string())
        .spawn(move || {
            let mut buf = vec![0u8; READ_CHUNK];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        if tx.blocking_send(Ok(buf[..n].to_vec())).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        let _ = tx.blocking_send(Err(e));
                        break;
                    }
                }
            }
        })?;

    Ok(rx)
}
