/// Append-only audit trail. Entries are never updated or deleted.
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use tracing::warn;
use uuid::Uuid;

use crate::db::{format_ts, parse_ts};
use crate::error::{CoreError, CoreResult};
use crate::models::audit::{AuditAction, AuditRecord};
use crate::rbac::UserContext;

/// Upper bound applied when the caller does not supply one, to avoid
/// unbounded scans.
pub const DEFAULT_LIST_LIMIT: u32 = 100;

#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub action: Option<AuditAction>,
    pub actor_id: Option<String>,
    pub limit: Option<u32>,
}

/// Strict append. Fails only when the underlying store is unavailable.
pub async fn append(
    pool: &SqlitePool,
    actor_id: Option<&str>,
    action: AuditAction,
    details: &str,
) -> CoreResult<AuditRecord> {
    let record = AuditRecord {
        id: Uuid::new_v4().to_string(),
        actor_id: actor_id.map(|s| s.to_string()),
        timestamp: Utc::now(),
        action,
        details: details.to_string(),
    };

    sqlx::query(
        "INSERT INTO audit_log (id, actor_id, timestamp, action, details) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&record.id)
    .bind(record.actor_id.as_deref())
    .bind(format_ts(&record.timestamp))
    .bind(action.as_str())
    .bind(&record.details)
    .execute(pool)
    .await?;

    Ok(record)
}

/// Best-effort append used after a guarded mutation has already committed.
/// The mutation is the source of truth; a failed audit write is logged and
/// does not roll it back.
pub async fn record(
    pool: &SqlitePool,
    actor_id: Option<&str>,
    action: AuditAction,
    details: &str,
) {
    if let Err(e) = append(pool, actor_id, action, details).await {
        warn!(action = action.as_str(), error = %e, "audit append failed");
    }
}

/// Admin-only read, newest first, bounded.
pub async fn list(
    pool: &SqlitePool,
    actor: &UserContext,
    filter: AuditFilter,
) -> CoreResult<Vec<AuditRecord>> {
    if !actor.role.capabilities().view_audit_log {
        return Err(CoreError::Authorization(
            "audit log is restricted to administrators".into(),
        ));
    }

    let limit = filter.limit.unwrap_or(DEFAULT_LIST_LIMIT);

    let mut sql = String::from("SELECT id, actor_id, timestamp, action, details FROM audit_log");
    let mut clauses: Vec<&str> = Vec::new();
    if filter.action.is_some() {
        clauses.push("action = ?");
    }
    if filter.actor_id.is_some() {
        clauses.push("actor_id = ?");
    }
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY timestamp DESC LIMIT ?");

    let mut query = sqlx::query(&sql);
    if let Some(action) = filter.action {
        query = query.bind(action.as_str());
    }
    if let Some(actor_id) = &filter.actor_id {
        query = query.bind(actor_id);
    }
    query = query.bind(limit as i64);

    let rows = query.fetch_all(pool).await?;
    rows.iter().map(row_to_record).collect()
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> CoreResult<AuditRecord> {
    let action_raw: String = row.try_get("action")?;
    let action = AuditAction::from_str(&action_raw)
        .ok_or_else(|| CoreError::Persistence(format!("unknown audit action '{action_raw}'")))?;
    let timestamp_raw: String = row.try_get("timestamp")?;

    Ok(AuditRecord {
        id: row.try_get("id")?,
        actor_id: row.try_get("actor_id")?,
        timestamp: parse_ts(&timestamp_raw)?,
        action,
        details: row.try_get("details")?,
    })
}
