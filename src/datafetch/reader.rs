use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use super::delimited::parse_csv;
use super::excel::parse_workbook;
use super::types::Table;
use super::DataFetchError;
use crate::storage::{BlobEntry, BlobStorage};

/// Source file formats the reader accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Excel,
}

impl SourceFormat {
    /// Detect the format from the file extension (case-insensitive).
    pub fn from_file_name(name: &str) -> Option<Self> {
        let (_, ext) = name.rsplit_once('.')?;
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(SourceFormat::Csv),
            "xlsx" | "xls" => Some(SourceFormat::Excel),
            _ => None,
        }
    }
}

/// Table name for a blob: base file name, extension stripped, spaces replaced
/// with underscores.
pub fn table_name_for(blob_name: &str) -> String {
    let file_name = blob_name.rsplit('/').next().unwrap_or(blob_name);
    let stem = match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file_name,
    };
    stem.replace(' ', "_")
}

/// Map storage-layer failures onto fetch errors, keeping not-found distinct.
fn storage_error(err: anyhow::Error) -> DataFetchError {
    let err = match err.downcast::<object_store::Error>() {
        Ok(e) => return e.into(),
        Err(err) => err,
    };
    match err.downcast::<std::io::Error>() {
        Ok(e) => e.into(),
        Err(err) => DataFetchError::Storage(format!("{:#}", err)),
    }
}

/// Reads every supported file under a folder and parses it into a [`Table`].
#[derive(Debug, Clone)]
pub struct BlobReader {
    storage: Arc<dyn BlobStorage>,
}

impl BlobReader {
    pub fn new(storage: Arc<dyn BlobStorage>) -> Self {
        Self { storage }
    }

    /// Download a single blob as raw bytes.
    pub async fn download(&self, container: &str, name: &str) -> Result<Vec<u8>, DataFetchError> {
        self.storage
            .read(container, name)
            .await
            .map_err(storage_error)
    }

    /// List, download and parse every `.csv`/`.xlsx`/`.xls` blob under `folder`.
    ///
    /// Tables come back in blob-name order. Fails with
    /// [`DataFetchError::NoSourceData`] when nothing matches.
    #[tracing::instrument(name = "read_tables", skip(self), fields(pushsync.table_count = tracing::field::Empty))]
    pub async fn read_tables(
        &self,
        container: &str,
        folder: &str,
    ) -> Result<Vec<Table>, DataFetchError> {
        let mut blobs: Vec<(BlobEntry, SourceFormat)> = self
            .storage
            .list(container, folder)
            .await
            .map_err(storage_error)?
            .into_iter()
            .filter_map(|entry| match SourceFormat::from_file_name(entry.file_name()) {
                Some(format) => Some((entry, format)),
                None => {
                    debug!(blob = %entry.name, "Skipping blob with unsupported extension");
                    None
                }
            })
            .collect();
        blobs.sort_by(|(a, _), (b, _)| a.name.cmp(&b.name));

        if blobs.is_empty() {
            return Err(DataFetchError::NoSourceData {
                container: container.to_string(),
                folder: folder.to_string(),
            });
        }

        let mut origin: HashMap<String, String> = HashMap::new();
        let mut tables = Vec::with_capacity(blobs.len());

        for (entry, format) in blobs {
            let table_name = table_name_for(&entry.name);
            if let Some(first) = origin.get(&table_name) {
                return Err(DataFetchError::DuplicateTable {
                    table: table_name,
                    first: first.clone(),
                    second: entry.name,
                });
            }

            let bytes = self.download(container, &entry.name).await?;
            let (columns, rows) = match format {
                SourceFormat::Csv => parse_csv(&entry.name, &bytes)?,
                SourceFormat::Excel => parse_workbook(&entry.name, bytes)?,
            };

            let table = Table::new(table_name.clone(), columns, rows);
            info!(
                blob = %entry.name,
                table = %table.name,
                columns = table.columns.len(),
                rows = table.row_count(),
                "Parsed source file"
            );

            origin.insert(table_name, entry.name);
            tables.push(table);
        }

        tracing::Span::current().record("pushsync.table_count", tables.len());
        Ok(tables)
    }
}
