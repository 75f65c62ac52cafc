use crate::auth::AccessToken;
use crate::engine::SyncEngine;
use crate::http::error::ApiError;
use crate::http::models::{FolderMigrateRequest, FolderMigrateResponse};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use std::sync::Arc;

/// Handler for POST /workspaces/{workspace_id}/folder-migrate
///
/// The body is optional; an empty request falls back to the configured dataset name.
#[tracing::instrument(
    name = "handler_folder_migrate",
    skip(engine, token, payload),
    fields(
        pushsync.dataset_id = tracing::field::Empty,
        pushsync.report_id = tracing::field::Empty,
    )
)]
pub async fn folder_migrate_handler(
    State(engine): State<Arc<SyncEngine>>,
    token: AccessToken,
    Path(workspace_id): Path<String>,
    payload: Result<Json<FolderMigrateRequest>, JsonRejection>,
) -> Result<Json<FolderMigrateResponse>, ApiError> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(JsonRejection::MissingJsonContentType(_)) => FolderMigrateRequest::default(),
        Err(e) => return Err(ApiError::bad_request(e.body_text())),
    };

    let outcome = engine
        .folder_migrate(&token, &workspace_id, request.report_name)
        .await?;

    let span = tracing::Span::current();
    span.record("pushsync.dataset_id", outcome.dataset_id.as_str());
    if let Some(report_id) = &outcome.report_id {
        span.record("pushsync.report_id", report_id.as_str());
    }

    Ok(Json(FolderMigrateResponse::new(workspace_id, outcome)))
}
