// src/storage/azure.rs
use anyhow::Result;
use async_trait::async_trait;
use futures::TryStreamExt;
use object_store::azure::{AzureConfigKey, MicrosoftAzureBuilder};
use object_store::{path::Path as ObjectPath, ObjectStore};
use std::sync::Arc;

use super::{folder_prefix, AzureConnection, BlobEntry, BlobStorage};

/// Azure Blob Storage addressed by a storage-account connection string.
#[derive(Debug, Clone)]
pub struct AzureBlobStorage {
    connection: AzureConnection,
}

impl AzureBlobStorage {
    pub fn new(connection: AzureConnection) -> Self {
        Self { connection }
    }

    pub fn from_connection_string(connection_string: &str) -> Result<Self> {
        Ok(Self::new(AzureConnection::parse(connection_string)?))
    }

    fn store(&self, container: &str) -> Result<Arc<dyn ObjectStore>> {
        let conn = &self.connection;
        let mut builder = MicrosoftAzureBuilder::new()
            .with_account(&conn.account)
            .with_container_name(container);

        if let Some(key) = &conn.access_key {
            builder = builder.with_access_key(key);
        }
        if let Some(sas) = &conn.sas_token {
            builder = builder.with_config(AzureConfigKey::SasKey, sas);
        }
        if let Some(endpoint) = &conn.blob_endpoint {
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(endpoint.starts_with("http://"));
        }
        if conn.use_emulator {
            builder = builder.with_use_emulator(true);
        }

        Ok(Arc::new(builder.build()?))
    }
}

#[async_trait]
impl BlobStorage for AzureBlobStorage {
    async fn list(&self, container: &str, prefix: &str) -> Result<Vec<BlobEntry>> {
        let store = self.store(container)?;
        let prefix = folder_prefix(prefix);
        let prefix_path = (!prefix.is_empty()).then(|| ObjectPath::from(prefix));

        let objects: Vec<_> = store.list(prefix_path.as_ref()).try_collect().await?;

        Ok(objects
            .into_iter()
            .map(|meta| BlobEntry {
                name: meta.location.to_string(),
            })
            .collect())
    }

    async fn read(&self, container: &str, name: &str) -> Result<Vec<u8>> {
        let store = self.store(container)?;
        let result = store.get(&ObjectPath::from(name)).await?;
        let bytes = result.bytes().await?;
        Ok(bytes.to_vec())
    }
}
