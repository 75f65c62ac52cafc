//! Power BI REST API access: push datasets, imports and report cloning.

mod client;
mod error;
pub mod models;

pub use client::PowerBiClient;
pub use error::PowerBiError;
pub use models::{CloneReportRequest, DatasetInfo};

/// Public cloud endpoint for the caller's own ("myorg") scope.
pub const DEFAULT_API_BASE: &str = "https://api.powerbi.com/v1.0/myorg";
