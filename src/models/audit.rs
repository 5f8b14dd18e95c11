use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed vocabulary of audited actions. Matching is exhaustive on the enum;
/// nothing downstream inspects action text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    CreatedSchedule,
    CancelledSchedule,
    DeliveredSchedule,
    DeliveryFailed,
    ConfigurationUpdated,
    RegisteredAccount,
    LoggedIn,
}

impl AuditAction {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "created_schedule" => Some(Self::CreatedSchedule),
            "cancelled_schedule" => Some(Self::CancelledSchedule),
            "delivered_schedule" => Some(Self::DeliveredSchedule),
            "delivery_failed" => Some(Self::DeliveryFailed),
            "configuration_updated" => Some(Self::ConfigurationUpdated),
            "registered_account" => Some(Self::RegisteredAccount),
            "logged_in" => Some(Self::LoggedIn),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreatedSchedule => "created_schedule",
            Self::CancelledSchedule => "cancelled_schedule",
            Self::DeliveredSchedule => "delivered_schedule",
            Self::DeliveryFailed => "delivery_failed",
            Self::ConfigurationUpdated => "configuration_updated",
            Self::RegisteredAccount => "registered_account",
            Self::LoggedIn => "logged_in",
        }
    }
}

/// One immutable entry in the audit trail. `actor_id` is None for actions
/// originated by the dispatcher, which has no user context.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditRecord {
    pub id: String,
    pub actor_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub action: AuditAction,
    pub details: String,
}
