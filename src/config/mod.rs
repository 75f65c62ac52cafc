use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::powerbi::DEFAULT_API_BASE;
use crate::sync::{ClearRowsPolicy, RetryPolicy, MAX_BATCH_SIZE};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub powerbi: PowerBiConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// "azure" or "filesystem"
    #[serde(rename = "type")]
    pub storage_type: String,
    /// Azure storage account connection string (azure only).
    pub connection_string: Option<String>,
    /// Directory holding one sub-directory per container (filesystem only).
    pub base_dir: Option<String>,
    /// Container read when a request does not name one.
    #[serde(default = "default_container")]
    pub default_container: String,
    /// Folder read when a request does not name one.
    #[serde(default = "default_folder")]
    pub default_folder: String,
    /// Container holding the empty `.pbix` template for auto-upload.
    pub template_container: Option<String>,
    /// Blob name of the empty `.pbix` template.
    pub template_blob: Option<String>,
}

fn default_container() -> String {
    "tableau-datasources".to_string()
}

fn default_folder() -> String {
    "raju".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PowerBiConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Workspace of the report cloned by folder-migrate.
    pub template_workspace_id: Option<String>,
    /// Report cloned by folder-migrate.
    pub template_report_id: Option<String>,
    /// Display name for datasets created by folder-migrate.
    /// Falls back to the request's report name.
    pub dataset_name: Option<String>,
}

impl Default for PowerBiConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            template_workspace_id: None,
            template_report_id: None,
            dataset_name: None,
        }
    }
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub clear_rows: ClearRowsPolicy,
    #[serde(default)]
    pub poll: PollConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            clear_rows: ClearRowsPolicy::default(),
            poll: PollConfig::default(),
        }
    }
}

fn default_batch_size() -> usize {
    MAX_BATCH_SIZE
}

/// Waiting for an imported template's dataset to appear.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PollConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default)]
    pub jitter_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            interval_ms: default_interval_ms(),
            jitter_ms: 0,
        }
    }
}

fn default_max_attempts() -> u32 {
    10
}

fn default_interval_ms() -> u64 {
    2_000
}

impl PollConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.interval_ms),
            Duration::from_millis(self.jitter_ms),
        )
    }
}

impl AppConfig {
    /// Load configuration from an optional file and environment variables
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        }

        // Add environment variables with prefix PUSHSYNC_
        // Example: PUSHSYNC_STORAGE__CONNECTION_STRING=...
        builder = builder.add_source(
            config::Environment::with_prefix("PUSHSYNC")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        match self.storage.storage_type.as_str() {
            "azure" => {
                if self.storage.connection_string.is_none() {
                    anyhow::bail!("Azure storage requires 'connection_string'");
                }
            }
            "filesystem" => {
                if self.storage.base_dir.is_none() {
                    anyhow::bail!("Filesystem storage requires 'base_dir'");
                }
            }
            _ => anyhow::bail!("Invalid storage type: {}", self.storage.storage_type),
        }

        if self.storage.template_container.is_some() != self.storage.template_blob.is_some() {
            anyhow::bail!("'template_container' and 'template_blob' must be set together");
        }

        if self.powerbi.template_workspace_id.is_some() != self.powerbi.template_report_id.is_some()
        {
            anyhow::bail!("'template_workspace_id' and 'template_report_id' must be set together");
        }

        if self.sync.batch_size == 0 || self.sync.batch_size > MAX_BATCH_SIZE {
            anyhow::bail!(
                "'batch_size' must be between 1 and {} (got {})",
                MAX_BATCH_SIZE,
                self.sync.batch_size
            );
        }

        if self.sync.poll.max_attempts == 0 {
            anyhow::bail!("'poll.max_attempts' must be at least 1");
        }

        Ok(())
    }
}
