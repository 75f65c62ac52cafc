//! Error types for reading tables out of blob storage

use thiserror::Error;

/// Errors that can occur while listing, downloading or parsing source files
#[derive(Debug, Error)]
pub enum DataFetchError {
    /// The object store could not be reached or rejected the request
    #[error("storage request failed: {0}")]
    Storage(String),

    /// A listed blob disappeared or a named blob does not exist
    #[error("blob not found: {0}")]
    BlobNotFound(String),

    /// No file with a supported extension exists under the folder
    #[error("No data files found in container '{container}' under '{folder}'")]
    NoSourceData { container: String, folder: String },

    /// The file could not be parsed in its declared format
    #[error("failed to parse '{file}': {message}")]
    Parse { file: String, message: String },

    /// Two files map onto the same table name
    #[error("files '{first}' and '{second}' both map to table '{table}'")]
    DuplicateTable {
        table: String,
        first: String,
        second: String,
    },
}

impl DataFetchError {
    pub fn parse(file: impl Into<String>, message: impl ToString) -> Self {
        DataFetchError::Parse {
            file: file.into(),
            message: message.to_string(),
        }
    }
}

impl From<object_store::Error> for DataFetchError {
    fn from(e: object_store::Error) -> Self {
        match e {
            object_store::Error::NotFound { path, .. } => DataFetchError::BlobNotFound(path),
            other => DataFetchError::Storage(other.to_string()),
        }
    }
}

impl From<std::io::Error> for DataFetchError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => DataFetchError::BlobNotFound(e.to_string()),
            _ => DataFetchError::Storage(e.to_string()),
        }
    }
}
