//! MetadataProvider trait definition.
//!
//! The MetadataProvider trait abstracts over ways of extracting file
//! metadata. The primary implementation sends `-json` queries through a shared
//! [`WorkerClient`](crate::worker::WorkerClient).

use async_trait::async_trait;

use super::record::{Record, RecordExt};
use crate::worker::WorkerError;

/// Result type for metadata operations.
pub type MetadataResult<T> = Result<T, WorkerError>;

/// Trait for extracting structured file metadata.
///
/// # Example
///
/// ```ignore
/// use stayopen::metadata::MetadataProvider;
///
/// async fn example(provider: &impl MetadataProvider) -> MetadataResult<()> {
///     let records = provider.get_metadata(&["a.jpg".into(), "b.jpg".into()]).await?;
///     let one = provider.get_file_metadata("c.jpg").await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Extract one record per file, in input order.
    ///
    /// Files the worker could not read may be missing from the result or carry
    /// their own `Error` tag.
    async fn get_metadata(&self, files: &[String]) -> MetadataResult<Vec<Record>>;

    /// Extract metadata for a single file.
    ///
    /// Returns `None` when no record's `SourceFile` matches `file`.
    async fn get_file_metadata(&self, file: &str) -> MetadataResult<Option<Record>> {
        let records = self.get_metadata(&[file.to_string()]).await?;

        Ok(records
            .into_iter()
            .find(|r| r.source_file() == Some(file)))
    }

    /// Extract metadata for several batches of files.
    ///
    /// Batches are issued together; a worker-backed provider still runs them
    /// one at a time.
    async fn get_metadata_batches(
        &self,
        batches: &[Vec<String>],
    ) -> MetadataResult<Vec<Vec<Record>>> {
        let futures: Vec<_> = batches
            .iter()
            .map(|files| self.get_metadata(files))
            .collect();

        let results = futures::future::join_all(futures).await;

        // Collect results, failing if any failed
        results.into_iter().collect()
    }
}
