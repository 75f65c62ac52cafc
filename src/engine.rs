use crate::auth::AccessToken;
use crate::datafetch::{BlobReader, RowFormat};
use crate::powerbi::{PowerBiClient, DEFAULT_API_BASE};
use crate::storage::{AzureBlobStorage, BlobStorage, FilesystemStorage};
use crate::sync::{
    ClearRowsPolicy, DatasetProvisioner, PushSummary, ReportCloner, RetryPolicy, RowPusher,
    SyncError, TemplateReport, MAX_BATCH_SIZE,
};
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

const DEFAULT_CONTAINER: &str = "tableau-datasources";
const DEFAULT_FOLDER: &str = "raju";

/// Location of the empty `.pbix` imported by auto-upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplatePbix {
    pub container: String,
    pub blob: String,
}

/// Result of an auto-upload run.
#[derive(Debug, Clone)]
pub struct AutoUploadOutcome {
    pub dataset_id: String,
    pub synced_tables: Vec<PushSummary>,
}

/// Result of a folder-migrate run.
#[derive(Debug, Clone)]
pub struct FolderMigrateOutcome {
    pub dataset_id: String,
    pub report_id: Option<String>,
    pub report_name: String,
    pub folder: String,
    pub synced_tables: Vec<PushSummary>,
}

/// Drives a sync from a blob folder into a workspace dataset.
///
/// Holds no per-request state; the caller's token is passed into each operation.
#[derive(Debug)]
pub struct SyncEngine {
    reader: BlobReader,
    provisioner: DatasetProvisioner,
    pusher: RowPusher,
    cloner: Option<ReportCloner>,
    template_pbix: Option<TemplatePbix>,
    dataset_name: Option<String>,
    default_container: String,
    default_folder: String,
}

impl SyncEngine {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// Create a builder for more control over engine configuration.
    pub fn builder() -> SyncEngineBuilder {
        SyncEngineBuilder::new()
    }

    /// Create a new engine from application configuration.
    pub fn from_config(config: &crate::config::AppConfig) -> Result<Self> {
        let storage = Self::create_storage_from_config(config)?;

        let mut builder = SyncEngine::builder()
            .storage(storage)
            .api_base(&config.powerbi.api_base)
            .retry_policy(config.sync.poll.retry_policy())
            .batch_size(config.sync.batch_size)
            .clear_rows_policy(config.sync.clear_rows)
            .default_container(&config.storage.default_container)
            .default_folder(&config.storage.default_folder);

        if let (Some(container), Some(blob)) = (
            &config.storage.template_container,
            &config.storage.template_blob,
        ) {
            builder = builder.template_pbix(container, blob);
        }

        if let (Some(workspace_id), Some(report_id)) = (
            &config.powerbi.template_workspace_id,
            &config.powerbi.template_report_id,
        ) {
            builder = builder.template_report(workspace_id, report_id);
        }

        if let Some(name) = &config.powerbi.dataset_name {
            builder = builder.dataset_name(name);
        }

        builder.build()
    }

    fn create_storage_from_config(
        config: &crate::config::AppConfig,
    ) -> Result<Arc<dyn BlobStorage>> {
        match config.storage.storage_type.as_str() {
            "azure" => {
                let connection_string =
                    config.storage.connection_string.as_ref().ok_or_else(|| {
                        anyhow::anyhow!("Azure storage requires connection_string")
                    })?;
                info!("Using Azure blob storage");
                Ok(Arc::new(AzureBlobStorage::from_connection_string(
                    connection_string,
                )?))
            }
            "filesystem" => {
                let base_dir = config
                    .storage
                    .base_dir
                    .as_ref()
                    .ok_or_else(|| anyhow::anyhow!("Filesystem storage requires base_dir"))?;
                info!(base_dir = %base_dir, "Using filesystem blob storage");
                Ok(Arc::new(FilesystemStorage::new(PathBuf::from(base_dir))))
            }
            _ => anyhow::bail!("Unsupported storage type: {}", config.storage.storage_type),
        }
    }

    pub fn default_container(&self) -> &str {
        &self.default_container
    }

    pub fn default_folder(&self) -> &str {
        &self.default_folder
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Read every table under the folder, import the template `.pbix` under
    /// `report_name`, then replace the rows of each table.
    #[tracing::instrument(
        name = "auto_upload",
        skip(self, token, report_name),
        fields(pushsync.dataset_id = tracing::field::Empty)
    )]
    pub async fn auto_upload(
        &self,
        token: &AccessToken,
        workspace_id: &str,
        report_name: Option<String>,
        container: Option<String>,
        folder: Option<String>,
    ) -> Result<AutoUploadOutcome, SyncError> {
        let report_name = required(report_name)
            .ok_or_else(|| SyncError::InvalidRequest("Report name missing".to_string()))?;

        let template = self.template_pbix.as_ref().ok_or_else(|| {
            SyncError::NotConfigured("no template .pbix (storage.template_blob)".to_string())
        })?;

        // An empty or unreadable folder fails before anything is imported
        let container = required(container).unwrap_or_else(|| self.default_container.clone());
        let folder = required(folder).unwrap_or_else(|| self.default_folder.clone());
        let tables = self.reader.read_tables(&container, &folder).await?;

        let pbix = self
            .reader
            .download(&template.container, &template.blob)
            .await?;

        let dataset_id = self
            .provisioner
            .import_template(token, workspace_id, &report_name, pbix)
            .await?;
        tracing::Span::current().record("pushsync.dataset_id", dataset_id.as_str());

        let mut synced_tables = Vec::with_capacity(tables.len());
        for table in &tables {
            let summary = self
                .pusher
                .sync_table(token, workspace_id, &dataset_id, table, RowFormat::Native)
                .await?;
            synced_tables.push(summary);
        }

        info!(
            dataset_id = %dataset_id,
            tables = synced_tables.len(),
            "Auto-upload completed"
        );

        Ok(AutoUploadOutcome {
            dataset_id,
            synced_tables,
        })
    }

    /// Create a push dataset from the default folder, fill it, and clone the
    /// template report onto it when one is configured.
    #[tracing::instrument(
        name = "folder_migrate",
        skip(self, token, report_name),
        fields(
            pushsync.dataset_id = tracing::field::Empty,
            pushsync.report_id = tracing::field::Empty,
        )
    )]
    pub async fn folder_migrate(
        &self,
        token: &AccessToken,
        workspace_id: &str,
        report_name: Option<String>,
    ) -> Result<FolderMigrateOutcome, SyncError> {
        let report_name = required(report_name);
        let dataset_name = self
            .dataset_name
            .clone()
            .or_else(|| report_name.clone())
            .ok_or_else(|| SyncError::InvalidRequest("Report name missing".to_string()))?;
        let report_name = report_name.unwrap_or_else(|| dataset_name.clone());

        let tables = self
            .reader
            .read_tables(&self.default_container, &self.default_folder)
            .await?;

        let dataset_id = self
            .provisioner
            .create_push_dataset(token, workspace_id, &dataset_name, &tables)
            .await?;
        tracing::Span::current().record("pushsync.dataset_id", dataset_id.as_str());

        let mut synced_tables = Vec::with_capacity(tables.len());
        for table in &tables {
            let summary = self
                .pusher
                .sync_table(token, workspace_id, &dataset_id, table, RowFormat::Text)
                .await?;
            synced_tables.push(summary);
        }

        let report_id = match &self.cloner {
            Some(cloner) => {
                let id = cloner
                    .clone_and_rebind(token, workspace_id, &dataset_id, &report_name)
                    .await?;
                tracing::Span::current().record("pushsync.report_id", id.as_str());
                Some(id)
            }
            None => None,
        };

        info!(
            dataset_id = %dataset_id,
            report_id = ?report_id,
            tables = synced_tables.len(),
            "Folder migration completed"
        );

        Ok(FolderMigrateOutcome {
            dataset_id,
            report_id,
            report_name,
            folder: self.default_folder.clone(),
            synced_tables,
        })
    }
}

/// Trimmed value of an optional request field, `None` when absent or blank.
fn required(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Builder for SyncEngine.
///
/// # Example
///
/// ```no_run
/// use pushsync::engine::SyncEngine;
/// use pushsync::storage::FilesystemStorage;
/// use std::sync::Arc;
///
/// let engine = SyncEngine::builder()
///     .storage(Arc::new(FilesystemStorage::new("/data/blobs")))
///     .template_pbix("templates", "empty.pbix")
///     .build()
///     .unwrap();
/// ```
pub struct SyncEngineBuilder {
    storage: Option<Arc<dyn BlobStorage>>,
    http_client: Option<reqwest::Client>,
    api_base: String,
    retry_policy: RetryPolicy,
    batch_size: usize,
    clear_rows_policy: ClearRowsPolicy,
    template_pbix: Option<TemplatePbix>,
    template_report: Option<TemplateReport>,
    dataset_name: Option<String>,
    default_container: String,
    default_folder: String,
}

impl Default for SyncEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncEngineBuilder {
    pub fn new() -> Self {
        Self {
            storage: None,
            http_client: None,
            api_base: DEFAULT_API_BASE.to_string(),
            retry_policy: RetryPolicy::default(),
            batch_size: MAX_BATCH_SIZE,
            clear_rows_policy: ClearRowsPolicy::default(),
            template_pbix: None,
            template_report: None,
            dataset_name: None,
            default_container: DEFAULT_CONTAINER.to_string(),
            default_folder: DEFAULT_FOLDER.to_string(),
        }
    }

    /// Set the blob storage backend. Required.
    pub fn storage(mut self, storage: Arc<dyn BlobStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Share an existing HTTP client instead of building one.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Base URL of the vendor API. Defaults to the public endpoint.
    pub fn api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Polling used while waiting for an imported dataset.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Rows per push request; clamped to `1..=MAX_BATCH_SIZE`.
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    pub fn clear_rows_policy(mut self, policy: ClearRowsPolicy) -> Self {
        self.clear_rows_policy = policy;
        self
    }

    /// Enables auto-upload.
    pub fn template_pbix(mut self, container: impl Into<String>, blob: impl Into<String>) -> Self {
        self.template_pbix = Some(TemplatePbix {
            container: container.into(),
            blob: blob.into(),
        });
        self
    }

    /// Report cloned onto every dataset created by folder-migrate.
    pub fn template_report(
        mut self,
        workspace_id: impl Into<String>,
        report_id: impl Into<String>,
    ) -> Self {
        self.template_report = Some(TemplateReport {
            workspace_id: workspace_id.into(),
            report_id: report_id.into(),
        });
        self
    }

    /// Fixed display name for datasets created by folder-migrate.
    pub fn dataset_name(mut self, name: impl Into<String>) -> Self {
        self.dataset_name = Some(name.into());
        self
    }

    pub fn default_container(mut self, container: impl Into<String>) -> Self {
        self.default_container = container.into();
        self
    }

    pub fn default_folder(mut self, folder: impl Into<String>) -> Self {
        self.default_folder = folder.into();
        self
    }

    pub fn build(self) -> Result<SyncEngine> {
        let storage = self
            .storage
            .ok_or_else(|| anyhow::anyhow!("SyncEngine requires a blob storage backend"))?;

        let client = match self.http_client {
            Some(http) => PowerBiClient::with_http_client(http, &self.api_base),
            None => PowerBiClient::new(&self.api_base)?,
        };

        let cloner = self
            .template_report
            .map(|template| ReportCloner::new(client.clone(), template));

        Ok(SyncEngine {
            reader: BlobReader::new(storage),
            provisioner: DatasetProvisioner::new(client.clone(), self.retry_policy),
            pusher: RowPusher::new(client, self.batch_size, self.clear_rows_policy),
            cloner,
            template_pbix: self.template_pbix,
            dataset_name: self.dataset_name,
            default_container: self.default_container,
            default_folder: self.default_folder,
        })
    }
}
