use serde::{Deserialize, Serialize};
use std::ops::Range;
use tracing::{info, warn};

use super::SyncError;
use crate::auth::AccessToken;
use crate::datafetch::{RowFormat, Table};
use crate::powerbi::PowerBiClient;

/// Most rows the push API accepts in a single request.
pub const MAX_BATCH_SIZE: usize = 10_000;

/// What to do when clearing a table before the push fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClearRowsPolicy {
    /// Log the failure and push anyway.
    #[default]
    BestEffort,
    /// Abort the table.
    Required,
}

/// Split `0..total` into consecutive ranges of at most `batch_size`.
pub fn batch_ranges(total: usize, batch_size: usize) -> Vec<Range<usize>> {
    let batch_size = batch_size.max(1);
    (0..total)
        .step_by(batch_size)
        .map(|start| start..(start + batch_size).min(total))
        .collect()
}

/// Outcome of pushing one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushSummary {
    pub table: String,
    pub rows: usize,
    pub batches: usize,
}

/// Replaces a push table's rows: clear, then POST sequential batches.
#[derive(Debug, Clone)]
pub struct RowPusher {
    client: PowerBiClient,
    batch_size: usize,
    clear_policy: ClearRowsPolicy,
}

impl RowPusher {
    /// `batch_size` is clamped to `1..=MAX_BATCH_SIZE`.
    pub fn new(client: PowerBiClient, batch_size: usize, clear_policy: ClearRowsPolicy) -> Self {
        Self {
            client,
            batch_size: batch_size.clamp(1, MAX_BATCH_SIZE),
            clear_policy,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    #[tracing::instrument(
        name = "sync_table",
        skip(self, token, table),
        fields(
            pushsync.table = %table.name,
            pushsync.rows = table.row_count(),
        )
    )]
    pub async fn sync_table(
        &self,
        token: &AccessToken,
        workspace_id: &str,
        dataset_id: &str,
        table: &Table,
        format: RowFormat,
    ) -> Result<PushSummary, SyncError> {
        if let Err(e) = self
            .client
            .delete_rows(token, workspace_id, dataset_id, &table.name)
            .await
        {
            match self.clear_policy {
                ClearRowsPolicy::BestEffort => {
                    warn!(table = %table.name, error = %e, "Failed to clear existing rows; pushing anyway");
                }
                ClearRowsPolicy::Required => {
                    return Err(SyncError::ClearRows {
                        table: table.name.clone(),
                        source: e,
                    });
                }
            }
        }

        let ranges = batch_ranges(table.row_count(), self.batch_size);
        let batches = ranges.len();

        for (index, range) in ranges.into_iter().enumerate() {
            let rows: Vec<_> = table.rows[range.clone()]
                .iter()
                .map(|row| table.row_to_json(row, format))
                .collect();

            self.client
                .post_rows(token, workspace_id, dataset_id, &table.name, &rows)
                .await
                .map_err(|source| SyncError::PushRows {
                    table: table.name.clone(),
                    batch: index + 1,
                    batches,
                    source,
                })?;

            info!(
                table = %table.name,
                batch = index + 1,
                batches,
                first_row = range.start,
                rows = range.len(),
                "Pushed batch"
            );
        }

        Ok(PushSummary {
            table: table.name.clone(),
            rows: table.row_count(),
            batches,
        })
    }
}
