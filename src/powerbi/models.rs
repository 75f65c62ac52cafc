use serde::{Deserialize, Serialize};

/// `{"value": [...]}` envelope used by list endpoints.
#[derive(Debug, Deserialize)]
pub struct ODataList<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DatasetInfo {
    pub id: String,
    pub name: String,
}

/// Response of dataset creation, import and clone calls.
#[derive(Debug, Deserialize)]
pub struct CreatedResource {
    pub id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloneReportRequest {
    pub name: String,
    pub target_workspace_id: String,
    pub target_model_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RebindReportRequest {
    pub dataset_id: String,
}

#[derive(Debug, Serialize)]
pub struct PostRowsRequest<'a> {
    pub rows: &'a [serde_json::Map<String, serde_json::Value>],
}
