//! The blob-to-dataset sync steps: provisioning, row pushing and report cloning.

mod error;
pub mod provisioner;
pub mod pusher;
pub mod report;
pub mod retry;

pub use error::SyncError;
pub use provisioner::DatasetProvisioner;
pub use pusher::{batch_ranges, ClearRowsPolicy, PushSummary, RowPusher, MAX_BATCH_SIZE};
pub use report::{ReportCloner, TemplateReport};
pub use retry::{PollExhausted, RetryPolicy};
