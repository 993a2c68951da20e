//! # stayopen
//!
//! Keeps one ExifTool process alive in `-stay_open` mode and pipelines
//! metadata queries through it, instead of paying process start-up on every
//! call.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │       metadata (MetadataProvider, Record decoding)       │
//! └─────────────────────────────────────────────────────────┘
//!                          │  -json <files…>
//!                          ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │     worker::WorkerClient (one query in flight, lock)     │
//! └─────────────────────────────────────────────────────────┘
//!                          │  directives + -execute
//!                          ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │   Session (child + stdin + merged stdout/stderr pipe)    │
//! └─────────────────────────────────────────────────────────┘
//!                          │  bytes
//!                          ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │          FrameSplitter (… {ready} boundaries)            │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod metadata;
pub mod worker;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::config::Settings;
    pub use crate::metadata::{
        MetadataProvider, MetadataResult, Record, RecordExt, WorkerMetadataProvider,
    };
    pub use crate::worker::{Response, SessionOptions, WorkerClient, WorkerError, WorkerResult};
}

pub use metadata::Record;
pub use worker::{Response, WorkerClient, WorkerError, WorkerResult};
