use tracing::{info, warn};

use super::retry::RetryPolicy;
use super::SyncError;
use crate::auth::AccessToken;
use crate::datafetch::Table;
use crate::datasets::infer_dataset;
use crate::powerbi::PowerBiClient;

/// Creates the dataset that rows are pushed into.
#[derive(Debug, Clone)]
pub struct DatasetProvisioner {
    client: PowerBiClient,
    retry: RetryPolicy,
}

impl DatasetProvisioner {
    pub fn new(client: PowerBiClient, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }

    /// Create a push dataset declaring one string-typed table per input table.
    #[tracing::instrument(
        name = "create_push_dataset",
        skip(self, token, tables),
        fields(pushsync.table_count = tables.len(), pushsync.dataset_id = tracing::field::Empty)
    )]
    pub async fn create_push_dataset(
        &self,
        token: &AccessToken,
        workspace_id: &str,
        name: &str,
        tables: &[Table],
    ) -> Result<String, SyncError> {
        let definition = infer_dataset(name, tables)?;
        let dataset_id = self
            .client
            .create_push_dataset(token, workspace_id, &definition)
            .await?;

        tracing::Span::current().record("pushsync.dataset_id", dataset_id.as_str());
        info!(dataset_id = %dataset_id, "Created push dataset");
        Ok(dataset_id)
    }

    /// Import a `.pbix` template under `display_name` and wait for its dataset to appear.
    #[tracing::instrument(
        name = "import_template",
        skip(self, token, pbix),
        fields(pushsync.size_bytes = pbix.len())
    )]
    pub async fn import_template(
        &self,
        token: &AccessToken,
        workspace_id: &str,
        display_name: &str,
        pbix: Vec<u8>,
    ) -> Result<String, SyncError> {
        let import_id = self
            .client
            .import_pbix(token, workspace_id, display_name, pbix)
            .await?;
        info!(import_id = ?import_id, "Template import accepted");

        self.wait_for_dataset(token, workspace_id, display_name).await
    }

    /// Poll the workspace's datasets until one is named `name` (case-insensitive).
    ///
    /// Listing failures are logged and count as an empty attempt.
    pub async fn wait_for_dataset(
        &self,
        token: &AccessToken,
        workspace_id: &str,
        name: &str,
    ) -> Result<String, SyncError> {
        let wanted = name.to_lowercase();

        self.retry
            .poll(|attempt| {
                let wanted = wanted.clone();
                async move {
                    match self.client.list_datasets(token, workspace_id).await {
                        Ok(datasets) => datasets
                            .into_iter()
                            .find(|d| d.name.to_lowercase() == wanted)
                            .map(|d| d.id),
                        Err(e) => {
                            warn!(attempt, error = %e, "Listing datasets failed while waiting for import");
                            None
                        }
                    }
                }
            })
            .await
            .map_err(|exhausted| SyncError::DatasetNotFound {
                name: name.to_string(),
                attempts: exhausted.attempts,
            })
    }
}
