//! Errors raised while syncing a blob folder into a dataset.

use thiserror::Error;

use crate::datafetch::DataFetchError;
use crate::datasets::SchemaError;
use crate::powerbi::PowerBiError;

#[derive(Debug, Error)]
pub enum SyncError {
    /// A required request field is missing or blank.
    #[error("{0}")]
    InvalidRequest(String),

    /// A deployment setting the operation needs is absent.
    #[error("Not configured: {0}")]
    NotConfigured(String),

    #[error(transparent)]
    Source(#[from] DataFetchError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Vendor(#[from] PowerBiError),

    /// The imported dataset never showed up in the workspace listing.
    #[error("Dataset not found after upload: no dataset named '{name}' appeared after {attempts} attempts")]
    DatasetNotFound { name: String, attempts: u32 },

    #[error("Failed to clear rows of table '{table}': {source}")]
    ClearRows {
        table: String,
        #[source]
        source: PowerBiError,
    },

    #[error("Failed to push rows to table '{table}' (batch {batch} of {batches}): {source}")]
    PushRows {
        table: String,
        batch: usize,
        batches: usize,
        #[source]
        source: PowerBiError,
    },
}

impl SyncError {
    /// The vendor error behind this failure, if any.
    pub fn vendor_error(&self) -> Option<&PowerBiError> {
        match self {
            SyncError::Vendor(e)
            | SyncError::ClearRows { source: e, .. }
            | SyncError::PushRows { source: e, .. } => Some(e),
            _ => None,
        }
    }
}
