pub mod app_server;
pub mod auth;
pub mod controllers;
pub mod error;
pub mod models;
