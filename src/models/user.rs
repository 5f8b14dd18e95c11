use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::rbac::Role;

/// Local profile row for an identity owned by the external auth service.
/// The role is fixed at registration; this subsystem has no path to change it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub login_email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}
