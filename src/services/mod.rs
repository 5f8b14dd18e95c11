pub mod audit_service;
pub mod auth_service;
pub mod config_service;
pub mod schedule_service;
