//! Push dataset definitions derived from parsed tables.

pub mod schema;

pub use schema::{infer_dataset, infer_table, ColumnSchema, DatasetDefinition, SchemaError, TableSchema};

/// Every inferred column is declared with this vendor data type.
pub const STRING_DATA_TYPE: &str = "string";

/// `defaultMode` for datasets whose rows are supplied through the API.
pub const PUSH_MODE: &str = "Push";
