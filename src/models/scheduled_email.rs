/// Scheduled email records and their delivery status.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailStatus {
    Scheduled,
    Sent,
    Failed,
    Cancelled,
}

impl EmailStatus {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "scheduled" => Some(Self::Scheduled),
            "sent" => Some(Self::Sent),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Sent => "sent",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Sent, Failed and Cancelled accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Scheduled)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduledEmail {
    pub id: String,
    pub owner_id: String,
    pub sender: String,
    pub recipients: Vec<String>,
    pub cc: Vec<String>,
    pub subject: String,
    pub body: String,
    pub scheduled_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub status: EmailStatus,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for scheduling a new email. `sender` defaults to the caller's login
/// address in the UI; the core validates it like any other address.
#[derive(Debug, Clone, Deserialize)]
pub struct NewScheduleRequest {
    pub sender: String,
    pub recipients: Vec<String>,
    pub cc: Vec<String>,
    pub subject: String,
    pub body: String,
    pub scheduled_at: DateTime<Utc>,
}

impl NewScheduleRequest {
    /// Build a request from free-text address fields as the compose form
    /// submits them (multiple addresses separated by comma or semicolon).
    pub fn from_form(
        sender: &str,
        recipients: &str,
        cc: &str,
        subject: &str,
        body: &str,
        scheduled_at: DateTime<Utc>,
    ) -> Self {
        NewScheduleRequest {
            sender: sender.trim().to_string(),
            recipients: split_address_list(recipients),
            cc: split_address_list(cc),
            subject: subject.to_string(),
            body: body.to_string(),
            scheduled_at,
        }
    }
}

pub fn split_address_list(raw: &str) -> Vec<String> {
    raw.split([',', ';'])
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}
