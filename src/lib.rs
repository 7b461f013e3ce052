//! Library entrypoint for pairwatch.
//!
//! This file exists mainly to make the HTTP surface easy to test
//! (integration tests under `tests/` can import the app state, routers,
//! controllers, services).

pub mod config;
pub mod error;
pub mod models;

// Keep this module at crate root because the codebase references it as
// `crate::auth`.
#[path = "middleware/auth.rs"]
pub mod auth;

pub mod services;

pub mod controllers;
pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub settings: config::Settings,
    pub alerts: services::alerts_service::AlertService,
    pub events_tx: tokio::sync::broadcast::Sender<services::alert_monitor::Event>,
}
