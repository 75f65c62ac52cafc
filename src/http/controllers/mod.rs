pub mod auto_upload_controller;
pub mod folder_migrate_controller;
pub mod health_controller;

pub use auto_upload_controller::auto_upload_handler;
pub use folder_migrate_controller::folder_migrate_handler;
pub use health_controller::health_handler;
