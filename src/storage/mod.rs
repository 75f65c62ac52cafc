// src/storage/mod.rs
use anyhow::Result;
use async_trait::async_trait;
use std::fmt::Debug;

pub mod azure;
pub mod connection_string;
pub mod filesystem;

// Re-exports
pub use azure::AzureBlobStorage;
pub use connection_string::AzureConnection;
pub use filesystem::FilesystemStorage;

/// A blob listed under a folder prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobEntry {
    /// Full blob name relative to the container, `/`-separated.
    pub name: String,
}

impl BlobEntry {
    /// Last path segment of the blob name.
    pub fn file_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}

/// Read access to containers of blobs.
///
/// Implementations build their client per call; containers are chosen per request.
#[async_trait]
pub trait BlobStorage: Debug + Send + Sync {
    /// List every blob in `container` whose name lives under `prefix`.
    /// An empty prefix lists the whole container.
    async fn list(&self, container: &str, prefix: &str) -> Result<Vec<BlobEntry>>;

    /// Download the full contents of a blob.
    async fn read(&self, container: &str, name: &str) -> Result<Vec<u8>>;
}

/// Normalize a folder into a directory prefix without leading or trailing `/`.
pub fn folder_prefix(folder: &str) -> &str {
    folder.trim_matches('/')
}
