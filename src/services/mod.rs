pub mod alert_monitor;
pub mod alerts_service;
pub mod feed;
pub mod registry;
pub mod store;
