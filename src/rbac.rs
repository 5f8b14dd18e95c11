// RBAC: roles, capabilities and the caller context passed into every
// store/recorder operation. There is no ambient "current user"; callers hand
// an explicit context to each service call.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Standard,
    Admin,
}

impl Role {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "standard" => Some(Self::Standard),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Admin => "admin",
        }
    }

    /// Single place mapping a role to what it may do. Services consult this
    /// instead of scattering role comparisons per call site.
    pub fn capabilities(&self) -> Capabilities {
        match self {
            Self::Standard => Capabilities {
                view_all_schedules: false,
                cancel_any_schedule: false,
                view_audit_log: false,
                manage_configuration: false,
            },
            Self::Admin => Capabilities {
                view_all_schedules: true,
                cancel_any_schedule: true,
                view_audit_log: true,
                manage_configuration: true,
            },
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Capabilities {
    pub view_all_schedules: bool,
    pub cancel_any_schedule: bool,
    pub view_audit_log: bool,
    pub manage_configuration: bool,
}

/// Resolved identity + role of the caller of a guarded operation.
#[derive(Debug, Clone)]
pub struct UserContext {
    pub user_id: String,
    pub role: Role,
}

impl UserContext {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        UserContext { user_id: user_id.into(), role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
