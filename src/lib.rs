//! Scheduled outbound email core: lifecycle store, audit trail and delivery
//! configuration. The dispatch engine that performs actual SMTP delivery is a
//! separate process reading the same database.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod rbac;
pub mod services;
pub mod smtp;
pub mod telemetry;

pub use error::{CoreError, CoreResult};
