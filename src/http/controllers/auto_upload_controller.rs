use crate::auth::AccessToken;
use crate::engine::SyncEngine;
use crate::http::error::ApiError;
use crate::http::models::{AutoUploadRequest, AutoUploadResponse};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use std::sync::Arc;

/// Handler for POST /workspaces/{workspace_id}/auto-upload
#[tracing::instrument(
    name = "handler_auto_upload",
    skip(engine, token, payload),
    fields(
        pushsync.dataset_id = tracing::field::Empty,
        pushsync.table_count = tracing::field::Empty,
    )
)]
pub async fn auto_upload_handler(
    State(engine): State<Arc<SyncEngine>>,
    token: AccessToken,
    Path(workspace_id): Path<String>,
    payload: Result<Json<AutoUploadRequest>, JsonRejection>,
) -> Result<Json<AutoUploadResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let outcome = engine
        .auto_upload(
            &token,
            &workspace_id,
            request.report_name,
            request.container_name,
            request.folder_path,
        )
        .await?;

    let span = tracing::Span::current();
    span.record("pushsync.dataset_id", outcome.dataset_id.as_str());
    span.record("pushsync.table_count", outcome.synced_tables.len());

    Ok(Json(outcome.into()))
}
