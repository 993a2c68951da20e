//! Metadata provider module.
//!
//! Turns the worker's raw `-json` output into structured records.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      MetadataProvider                           │
//! │  - get_metadata(files)       → Vec<Record>                      │
//! │  - get_file_metadata(file)   → Option<Record>                   │
//! │  - get_metadata_batches(…)   → Vec<Vec<Record>>                 │
//! └─────────────────────────────────────────────────────────────────┘
//!                           │
//!                           ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      WorkerClient                               │
//! │          (-json <files…> -execute  →  JSON array {ready})       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use stayopen::metadata::{MetadataProvider, RecordExt, WorkerMetadataProvider};
//! use stayopen::worker::WorkerClient;
//!
//! let client = WorkerClient::spawn("exiftool").await?;
//! let provider = WorkerMetadataProvider::with_client(client);
//!
//! for record in provider.get_metadata(&["a.jpg".into()]).await? {
//!     println!("{:?}: {:?}", record.source_file(), record.get_string("ImageSize"));
//! }
//! ```

mod provider;
mod record;
mod worker_provider;

pub use provider::{MetadataProvider, MetadataResult};
pub use record::{decode_records, Record, RecordExt, SOURCE_FILE};
pub use worker_provider::WorkerMetadataProvider;
