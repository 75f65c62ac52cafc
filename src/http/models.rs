use serde::{Deserialize, Serialize};

use crate::engine::{AutoUploadOutcome, FolderMigrateOutcome};
use crate::sync::PushSummary;

/// Request body for POST /workspaces/{workspace_id}/auto-upload
#[derive(Debug, Default, Deserialize)]
pub struct AutoUploadRequest {
    #[serde(default)]
    pub report_name: Option<String>,
    #[serde(default)]
    pub container_name: Option<String>,
    #[serde(default)]
    pub folder_path: Option<String>,
}

/// Response body for POST /workspaces/{workspace_id}/auto-upload
#[derive(Debug, Serialize, Deserialize)]
pub struct AutoUploadResponse {
    pub message: String,
    pub dataset_id: String,
    pub synced_tables: Vec<String>,
}

impl From<AutoUploadOutcome> for AutoUploadResponse {
    fn from(outcome: AutoUploadOutcome) -> Self {
        Self {
            message: "Migration completed successfully".to_string(),
            dataset_id: outcome.dataset_id,
            synced_tables: table_names(outcome.synced_tables),
        }
    }
}

/// Request body for POST /workspaces/{workspace_id}/folder-migrate
#[derive(Debug, Default, Deserialize)]
pub struct FolderMigrateRequest {
    #[serde(default)]
    pub report_name: Option<String>,
}

/// Response body for POST /workspaces/{workspace_id}/folder-migrate
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderMigrateResponse {
    pub success: bool,
    pub workspace_id: String,
    pub dataset_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_id: Option<String>,
    pub report_name: String,
    pub folder: String,
    #[serde(rename = "synced_tables")]
    pub synced_tables: Vec<String>,
}

impl FolderMigrateResponse {
    pub fn new(workspace_id: String, outcome: FolderMigrateOutcome) -> Self {
        Self {
            success: true,
            workspace_id,
            dataset_id: outcome.dataset_id,
            report_id: outcome.report_id,
            report_name: outcome.report_name,
            folder: outcome.folder,
            synced_tables: table_names(outcome.synced_tables),
        }
    }
}

fn table_names(summaries: Vec<PushSummary>) -> Vec<String> {
    summaries.into_iter().map(|s| s.table).collect()
}
