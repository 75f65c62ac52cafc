use crate::engine::SyncEngine;
use crate::http::controllers::{auto_upload_handler, folder_migrate_handler, health_handler};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

pub struct AppServer {
    pub router: Router,
    pub engine: Arc<SyncEngine>,
}

pub const PATH_HEALTH: &str = "/health";
pub const PATH_AUTO_UPLOAD: &str = "/workspaces/{workspace_id}/auto-upload";
pub const PATH_FOLDER_MIGRATE: &str = "/workspaces/{workspace_id}/folder-migrate";

impl AppServer {
    pub fn new(engine: SyncEngine) -> Self {
        let engine = Arc::new(engine);
        AppServer {
            router: Router::new()
                .route(PATH_HEALTH, get(health_handler))
                .route(PATH_AUTO_UPLOAD, post(auto_upload_handler))
                .route(PATH_FOLDER_MIGRATE, post(folder_migrate_handler))
                .with_state(engine.clone()),
            engine,
        }
    }
}
