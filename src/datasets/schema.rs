//! Schema inference from parsed tables.
//!
//! Columns are uniformly declared as `string`; source content is not inspected.

use super::{PUSH_MODE, STRING_DATA_TYPE};
use crate::datafetch::Table;
use serde::{Deserialize, Serialize};

/// Error when a table cannot be declared in a dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The source file had no header row.
    NoColumns { table: String },
    /// A dataset needs at least one table.
    NoTables,
}

impl std::fmt::Display for SchemaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoColumns { table } => write!(f, "Table '{}' has no columns", table),
            Self::NoTables => write!(f, "Dataset must declare at least one table"),
        }
    }
}

impl std::error::Error for SchemaError {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSchema {
    pub name: String,
    pub data_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnSchema>,
}

/// Request body for creating a push dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetDefinition {
    pub name: String,
    pub default_mode: String,
    pub tables: Vec<TableSchema>,
}

/// Declare a table's columns, in source order, all typed as `string`.
pub fn infer_table(table: &Table) -> Result<TableSchema, SchemaError> {
    if table.columns.is_empty() {
        return Err(SchemaError::NoColumns {
            table: table.name.clone(),
        });
    }

    Ok(TableSchema {
        name: table.name.clone(),
        columns: table
            .columns
            .iter()
            .map(|name| ColumnSchema {
                name: name.clone(),
                data_type: STRING_DATA_TYPE.to_string(),
            })
            .collect(),
    })
}

/// Build a push dataset definition declaring one table per input table.
pub fn infer_dataset(name: &str, tables: &[Table]) -> Result<DatasetDefinition, SchemaError> {
    if tables.is_empty() {
        return Err(SchemaError::NoTables);
    }

    Ok(DatasetDefinition {
        name: name.to_string(),
        default_mode: PUSH_MODE.to_string(),
        tables: tables.iter().map(infer_table).collect::<Result<_, _>>()?,
    })
}
