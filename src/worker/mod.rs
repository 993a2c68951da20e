//! Worker communication module.
//!
//! This module keeps one metadata-extraction worker (ExifTool) alive in
//! `-stay_open` mode and pipelines queries through its stdin/stdout.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                   WorkerClient (Async + Tokio)                  │
//! │  - One Mutex held across write directives → read frame          │
//! │  - Classifies Warning:/Error: lines                             │
//! │  ┌───────────────────────────────────────────────────────────┐  │
//! │  │                        Session                            │  │
//! │  │  - Child process (kill on drop)                           │  │
//! │  │  - stdin writer                                           │  │
//! │  │  - merged stdout+stderr pipe → FrameSplitter              │  │
//! │  └───────────────────────────────────────────────────────────┘  │
//! │                              │                                  │
//! │      stdin (args, -execute)  │  stdout+stderr (… {ready})       │
//! │                              ▼                                  │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//!                                ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │        exiftool -stay_open True -@ -  (long-running child)      │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use stayopen::worker::WorkerClient;
//!
//! let client = WorkerClient::spawn("exiftool").await?;
//!
//! let response = client.execute(&["-s", "-ImageSize", "photo.jpg"]).await?;
//! for warning in &response.warnings {
//!     eprintln!("warning: {warning}");
//! }
//!
//! client.close().await?;
//! ```

mod client;
mod error;
pub mod protocol;
mod session;
pub mod splitter;

pub use client::WorkerClient;
pub use error::{WorkerError, WorkerResult};
pub use protocol::Response;
pub use session::{SessionOptions, SessionState};
