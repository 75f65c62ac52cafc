use tracing::{info, warn};

use super::SyncError;
use crate::auth::AccessToken;
use crate::powerbi::{CloneReportRequest, PowerBiClient};

/// A pre-built report whose visuals are reused for every migrated dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateReport {
    pub workspace_id: String,
    pub report_id: String,
}

/// Clones the template report and points the copy at a dataset.
#[derive(Debug, Clone)]
pub struct ReportCloner {
    client: PowerBiClient,
    template: TemplateReport,
}

impl ReportCloner {
    pub fn new(client: PowerBiClient, template: TemplateReport) -> Self {
        Self { client, template }
    }

    /// Clone into `workspace_id` bound to `dataset_id`, then rebind explicitly.
    /// A failed rebind is logged; the clone already targets the dataset.
    #[tracing::instrument(name = "clone_report", skip(self, token))]
    pub async fn clone_and_rebind(
        &self,
        token: &AccessToken,
        workspace_id: &str,
        dataset_id: &str,
        report_name: &str,
    ) -> Result<String, SyncError> {
        let request = CloneReportRequest {
            name: report_name.to_string(),
            target_workspace_id: workspace_id.to_string(),
            target_model_id: dataset_id.to_string(),
        };

        let report_id = self
            .client
            .clone_report(
                token,
                &self.template.workspace_id,
                &self.template.report_id,
                &request,
            )
            .await?;
        info!(report_id = %report_id, "Cloned template report");

        if let Err(e) = self
            .client
            .rebind_report(token, workspace_id, &report_id, dataset_id)
            .await
        {
            warn!(report_id = %report_id, error = %e, "Rebind after clone failed");
        }

        Ok(report_id)
    }
}
