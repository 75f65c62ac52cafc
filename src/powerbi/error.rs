//! Error types for Power BI REST calls

use thiserror::Error;

/// Errors returned by [`super::PowerBiClient`]
#[derive(Debug, Error)]
pub enum PowerBiError {
    /// The API answered with a non-success status; `body` is forwarded verbatim
    #[error("{operation} failed with HTTP {status}: {body}")]
    Rejected {
        operation: &'static str,
        status: u16,
        body: String,
    },

    /// The request never produced a response (DNS, TLS, timeout, ...)
    #[error("{operation} request failed: {message}")]
    Transport {
        operation: &'static str,
        message: String,
    },

    /// The response body did not have the expected shape
    #[error("{operation} returned an unexpected response: {message}")]
    Decode {
        operation: &'static str,
        message: String,
    },
}

impl PowerBiError {
    /// Upstream HTTP status, when the API responded.
    pub fn status(&self) -> Option<u16> {
        match self {
            PowerBiError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Raw upstream body for rejections, otherwise the error text.
    pub fn detail(&self) -> String {
        match self {
            PowerBiError::Rejected { body, .. } => body.clone(),
            other => other.to_string(),
        }
    }
}
