/// Scheduled email lifecycle: creation, role-scoped reads, and the status
/// state machine. Every transition is a conditional update keyed on the
/// expected prior status, so racing callers cannot both win.
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::db::{format_ts, parse_ts};
use crate::error::{CoreError, CoreResult};
use crate::models::audit::AuditAction;
use crate::models::scheduled_email::{EmailStatus, NewScheduleRequest, ScheduledEmail};
use crate::rbac::UserContext;
use crate::services::audit_service;

const EMAIL_COLUMNS: &str = "id, owner_id, sender, recipients, cc, subject, body, \
     scheduled_at, sent_at, status, error_message, created_at, updated_at";

/// Validate and persist a new schedule. The record starts out `Scheduled`;
/// only the external dispatcher moves it to `Sent` or `Failed`.
pub async fn create_schedule(
    pool: &SqlitePool,
    actor: &UserContext,
    req: NewScheduleRequest,
) -> CoreResult<ScheduledEmail> {
    validate_address(&req.sender)?;
    if req.recipients.is_empty() {
        return Err(CoreError::Validation(
            "at least one recipient is required".into(),
        ));
    }
    for addr in req.recipients.iter().chain(req.cc.iter()) {
        validate_address(addr)?;
    }
    if req.subject.trim().is_empty() {
        return Err(CoreError::Validation("subject must not be empty".into()));
    }
    if req.body.trim().is_empty() {
        return Err(CoreError::Validation("body must not be empty".into()));
    }

    let now = Utc::now();
    if req.scheduled_at <= now {
        return Err(CoreError::Validation(
            "scheduled time must be in the future".into(),
        ));
    }

    let email = ScheduledEmail {
        id: Uuid::new_v4().to_string(),
        owner_id: actor.user_id.clone(),
        sender: req.sender,
        recipients: req.recipients,
        cc: req.cc,
        subject: req.subject,
        body: req.body,
        scheduled_at: req.scheduled_at,
        sent_at: None,
        status: EmailStatus::Scheduled,
        error_message: None,
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        "INSERT INTO scheduled_emails (\
             id, owner_id, sender, recipients, cc, subject, body, \
             scheduled_at, status, created_at, updated_at\
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&email.id)
    .bind(&email.owner_id)
    .bind(&email.sender)
    .bind(encode_list(&email.recipients)?)
    .bind(encode_list(&email.cc)?)
    .bind(&email.subject)
    .bind(&email.body)
    .bind(format_ts(&email.scheduled_at))
    .bind(email.status.as_str())
    .bind(format_ts(&email.created_at))
    .bind(format_ts(&email.updated_at))
    .execute(pool)
    .await?;

    audit_service::record(
        pool,
        Some(actor.user_id.as_str()),
        AuditAction::CreatedSchedule,
        &format!(
            "user '{}' scheduled email '{}' to {}",
            actor.user_id,
            email.subject,
            email.recipients.join(", ")
        ),
    )
    .await;

    Ok(email)
}

/// Fetch a single record, scoped to the caller unless they may view all.
pub async fn get_schedule(
    pool: &SqlitePool,
    actor: &UserContext,
    id: &str,
) -> CoreResult<ScheduledEmail> {
    let email = fetch(pool, id).await?.ok_or_else(|| not_found(id))?;
    if email.owner_id != actor.user_id && !actor.role.capabilities().view_all_schedules {
        return Err(not_found(id));
    }
    Ok(email)
}

/// Upcoming sends: still-`Scheduled` records, earliest first.
pub async fn list_pending(
    pool: &SqlitePool,
    actor: &UserContext,
) -> CoreResult<Vec<ScheduledEmail>> {
    let mut sql = format!(
        "SELECT {EMAIL_COLUMNS} FROM scheduled_emails WHERE status = 'scheduled'"
    );
    let scoped = !actor.role.capabilities().view_all_schedules;
    if scoped {
        sql.push_str(" AND owner_id = ?");
    }
    sql.push_str(" ORDER BY scheduled_at ASC");

    let mut query = sqlx::query(&sql);
    if scoped {
        query = query.bind(&actor.user_id);
    }
    let rows = query.fetch_all(pool).await?;
    rows.iter().map(row_to_email).collect()
}

/// Full history across all statuses, newest creation first, optionally
/// filtered by status.
pub async fn list_history(
    pool: &SqlitePool,
    actor: &UserContext,
    status: Option<EmailStatus>,
) -> CoreResult<Vec<ScheduledEmail>> {
    let mut sql = format!("SELECT {EMAIL_COLUMNS} FROM scheduled_emails");
    let scoped = !actor.role.capabilities().view_all_schedules;
    let mut clauses: Vec<&str> = Vec::new();
    if scoped {
        clauses.push("owner_id = ?");
    }
    if status.is_some() {
        clauses.push("status = ?");
    }
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY created_at DESC");

    let mut query = sqlx::query(&sql);
    if scoped {
        query = query.bind(&actor.user_id);
    }
    if let Some(status) = status {
        query = query.bind(status.as_str());
    }
    let rows = query.fetch_all(pool).await?;
    rows.iter().map(row_to_email).collect()
}

/// Dispatcher read contract: every `Scheduled` record whose send time has
/// passed, earliest due first to bound worst-case lateness.
pub async fn due_schedules(
    pool: &SqlitePool,
    now: DateTime<Utc>,
) -> CoreResult<Vec<ScheduledEmail>> {
    let rows = sqlx::query(&format!(
        "SELECT {EMAIL_COLUMNS} FROM scheduled_emails \
         WHERE status = 'scheduled' AND scheduled_at <= ? \
         ORDER BY scheduled_at ASC"
    ))
    .bind(format_ts(&now))
    .fetch_all(pool)
    .await?;
    rows.iter().map(row_to_email).collect()
}

/// Cancel a still-`Scheduled` record. Only the owner or an admin may cancel;
/// a record in any other state is rejected, not silently ignored.
pub async fn cancel_schedule(
    pool: &SqlitePool,
    actor: &UserContext,
    id: &str,
) -> CoreResult<ScheduledEmail> {
    let email = fetch(pool, id).await?.ok_or_else(|| not_found(id))?;
    if email.owner_id != actor.user_id && !actor.role.capabilities().cancel_any_schedule {
        return Err(CoreError::Authorization(format!(
            "user '{}' may not cancel schedule '{id}'",
            actor.user_id
        )));
    }

    let now = Utc::now();
    let result = sqlx::query(
        "UPDATE scheduled_emails SET status = 'cancelled', updated_at = ? \
         WHERE id = ? AND status = 'scheduled'",
    )
    .bind(format_ts(&now))
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(transition_refused(pool, id, "cancel").await);
    }

    audit_service::record(
        pool,
        Some(actor.user_id.as_str()),
        AuditAction::CancelledSchedule,
        &format!(
            "user '{}' cancelled scheduled email '{}'",
            actor.user_id, email.subject
        ),
    )
    .await;

    fetch(pool, id).await?.ok_or_else(|| not_found(id))
}

/// Dispatcher transition: delivery succeeded. Stamps the actual send time.
pub async fn mark_sent(
    pool: &SqlitePool,
    id: &str,
    sent_at: DateTime<Utc>,
) -> CoreResult<ScheduledEmail> {
    let result = sqlx::query(
        "UPDATE scheduled_emails \
         SET status = 'sent', sent_at = ?, error_message = NULL, updated_at = ? \
         WHERE id = ? AND status = 'scheduled'",
    )
    .bind(format_ts(&sent_at))
    .bind(format_ts(&Utc::now()))
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(transition_refused(pool, id, "mark sent").await);
    }

    let email = fetch(pool, id).await?.ok_or_else(|| not_found(id))?;
    audit_service::record(
        pool,
        None,
        AuditAction::DeliveredSchedule,
        &format!(
            "scheduled email '{}' delivered to {}",
            email.subject,
            email.recipients.join(", ")
        ),
    )
    .await;
    Ok(email)
}

/// Dispatcher transition: delivery failed terminally. Failures do not
/// auto-retry here; retry policy belongs to the dispatcher.
pub async fn mark_failed(
    pool: &SqlitePool,
    id: &str,
    failed_at: DateTime<Utc>,
    reason: &str,
) -> CoreResult<ScheduledEmail> {
    let result = sqlx::query(
        "UPDATE scheduled_emails \
         SET status = 'failed', sent_at = ?, error_message = ?, updated_at = ? \
         WHERE id = ? AND status = 'scheduled'",
    )
    .bind(format_ts(&failed_at))
    .bind(reason)
    .bind(format_ts(&Utc::now()))
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(transition_refused(pool, id, "mark failed").await);
    }

    let email = fetch(pool, id).await?.ok_or_else(|| not_found(id))?;
    audit_service::record(
        pool,
        None,
        AuditAction::DeliveryFailed,
        &format!("scheduled email '{}' failed: {reason}", email.subject),
    )
    .await;
    Ok(email)
}

async fn fetch(pool: &SqlitePool, id: &str) -> CoreResult<Option<ScheduledEmail>> {
    let row = sqlx::query(&format!(
        "SELECT {EMAIL_COLUMNS} FROM scheduled_emails WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    row.as_ref().map(row_to_email).transpose()
}

/// Build the error for a conditional update that matched no row: either the
/// record is gone or it is no longer `Scheduled` (a concurrent caller won).
async fn transition_refused(pool: &SqlitePool, id: &str, attempted: &str) -> CoreError {
    match fetch(pool, id).await {
        Ok(Some(current)) => CoreError::InvalidTransition(format!(
            "cannot {attempted}: schedule '{id}' is {}",
            current.status.as_str()
        )),
        Ok(None) => not_found(id),
        Err(e) => e,
    }
}

fn not_found(id: &str) -> CoreError {
    CoreError::NotFound(format!("schedule '{id}'"))
}

fn validate_address(addr: &str) -> CoreResult<()> {
    addr.parse::<lettre::Address>()
        .map(|_| ())
        .map_err(|_| CoreError::Validation(format!("invalid email address '{addr}'")))
}

fn encode_list(list: &[String]) -> CoreResult<String> {
    serde_json::to_string(list).map_err(|e| CoreError::Persistence(e.to_string()))
}

fn decode_list(raw: &str) -> CoreResult<Vec<String>> {
    serde_json::from_str(raw)
        .map_err(|e| CoreError::Persistence(format!("bad address list '{raw}': {e}")))
}

fn row_to_email(row: &sqlx::sqlite::SqliteRow) -> CoreResult<ScheduledEmail> {
    let status_raw: String = row.try_get("status")?;
    let status = EmailStatus::from_str(&status_raw)
        .ok_or_else(|| CoreError::Persistence(format!("unknown status '{status_raw}'")))?;
    let recipients_raw: String = row.try_get("recipients")?;
    let cc_raw: String = row.try_get("cc")?;
    let scheduled_at_raw: String = row.try_get("scheduled_at")?;
    let sent_at_raw: Option<String> = row.try_get("sent_at")?;
    let created_at_raw: String = row.try_get("created_at")?;
    let updated_at_raw: String = row.try_get("updated_at")?;

    Ok(ScheduledEmail {
        id: row.try_get("id")?,
        owner_id: row.try_get("owner_id")?,
        sender: row.try_get("sender")?,
        recipients: decode_list(&recipients_raw)?,
        cc: decode_list(&cc_raw)?,
        subject: row.try_get("subject")?,
        body: row.try_get("body")?,
        scheduled_at: parse_ts(&scheduled_at_raw)?,
        sent_at: sent_at_raw.as_deref().map(parse_ts).transpose()?,
        status,
        error_message: row.try_get("error_message")?,
        created_at: parse_ts(&created_at_raw)?,
        updated_at: parse_ts(&updated_at_raw)?,
    })
}
