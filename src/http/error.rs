use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::datafetch::DataFetchError;
use crate::powerbi::PowerBiError;
use crate::sync::SyncError;

/// API error with HTTP status code
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub code: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            code: "BAD_REQUEST".to_string(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: message.into(),
            code: "UNAUTHORIZED".to_string(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
            code: "NOT_FOUND".to_string(),
        }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
            code: "INTERNAL_SERVER_ERROR".to_string(),
        }
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: message.into(),
            code: "SERVICE_UNAVAILABLE".to_string(),
        }
    }

    /// Relay a vendor rejection with its status. Statuses that are not
    /// errors become 500.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let status = StatusCode::from_u16(status)
            .ok()
            .filter(|s| s.is_client_error() || s.is_server_error())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let code = status
            .canonical_reason()
            .map(|reason| reason.to_ascii_uppercase().replace([' ', '-'], "_"))
            .unwrap_or_else(|| format!("HTTP_{}", status.as_u16()));
        Self {
            status,
            message: message.into(),
            code,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "detail": self.message,
            "code": self.code,
        }));

        (self.status, body).into_response()
    }
}

/// Convert PowerBiError to ApiError
impl From<PowerBiError> for ApiError {
    fn from(e: PowerBiError) -> Self {
        match e.status() {
            Some(status) => ApiError::from_status(status, e.detail()),
            None => {
                tracing::error!(error = %e, "Power BI call failed");
                ApiError::internal_error(e.to_string())
            }
        }
    }
}

/// Convert SyncError to ApiError
impl From<SyncError> for ApiError {
    fn from(e: SyncError) -> Self {
        if let Some(status) = e.vendor_error().and_then(PowerBiError::status) {
            // Row failures carry the table and batch in their display form.
            let detail = match &e {
                SyncError::Vendor(vendor) => vendor.detail(),
                _ => e.to_string(),
            };
            tracing::warn!(status, error = %e, "Power BI rejected the request");
            return ApiError::from_status(status, detail);
        }

        let constructor = match &e {
            SyncError::InvalidRequest(_) | SyncError::Schema(_) => ApiError::bad_request,
            SyncError::NotConfigured(_) => ApiError::service_unavailable,
            SyncError::DatasetNotFound { .. } => ApiError::not_found,
            SyncError::Source(source) => match source {
                DataFetchError::NoSourceData { .. } | DataFetchError::BlobNotFound(_) => {
                    ApiError::not_found
                }
                DataFetchError::DuplicateTable { .. } => ApiError::bad_request,
                DataFetchError::Storage(_) | DataFetchError::Parse { .. } => {
                    ApiError::internal_error
                }
            },
            SyncError::Vendor(_) | SyncError::ClearRows { .. } | SyncError::PushRows { .. } => {
                ApiError::internal_error
            }
        };

        let api_error = constructor(e.to_string());
        if api_error.status.is_server_error() {
            tracing::error!(error = ?anyhow::Error::new(e), "Sync request failed");
        }
        api_error
    }
}
