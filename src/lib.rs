pub mod auth;
pub mod config;
pub mod datafetch;
pub mod datasets;
pub mod engine;
pub mod http;
pub mod powerbi;
pub mod storage;
pub mod sync;
pub mod telemetry;

pub use auth::AccessToken;
pub use engine::{SyncEngine, SyncEngineBuilder};
