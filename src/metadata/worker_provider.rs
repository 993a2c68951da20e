//! WorkerMetadataProvider implementation.
//!
//! This module provides the primary MetadataProvider implementation, backed
//! by a shared WorkerClient.

use std::sync::Arc;

use async_trait::async_trait;

use super::provider::{MetadataProvider, MetadataResult};
use super::record::Record;
use crate::worker::WorkerClient;

/// MetadataProvider implementation that uses the WorkerClient.
///
/// # Example
///
/// ```ignore
/// use stayopen::worker::WorkerClient;
/// use stayopen::metadata::WorkerMetadataProvider;
///
/// let client = WorkerClient::spawn("exiftool").await?;
/// let provider = WorkerMetadataProvider::with_client(client).with_args(["-n", "-G"]);
///
/// let records = provider.get_metadata(&["a.jpg".to_string()]).await?;
/// ```
pub struct WorkerMetadataProvider {
    /// The worker client.
    client: Arc<WorkerClient>,
    /// Flags sent between `-json` and the file list.
    args: Vec<String>,
}

impl WorkerMetadataProvider {
    /// Create a new WorkerMetadataProvider.
    pub fn new(client: Arc<WorkerClient>) -> Self {
        Self {
            client,
            args: Vec::new(),
        }
    }

    /// Create a new WorkerMetadataProvider with an owned client.
    pub fn with_client(client: WorkerClient) -> Self {
        Self::new(Arc::new(client))
    }

    /// Add flags sent with every query (for example `-n` or `-G`).
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Get the extra flags.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Get the shared client.
    pub fn client(&self) -> &Arc<WorkerClient> {
        &self.client
    }
}

#[async_trait]
impl MetadataProvider for WorkerMetadataProvider {
    async fn get_metadata(&self, files: &[String]) -> MetadataResult<Vec<Record>> {
        self.client.get_metadata_with_args(&self.args, files).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_construction() {
        fn _assert_provider_is_send_sync<T: Send + Sync>() {}
        _assert_provider_is_send_sync::<WorkerMetadataProvider>();
    }
}
