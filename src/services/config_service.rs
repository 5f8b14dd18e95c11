/// Singleton outbound delivery configuration. Writes are full replacements;
/// there is no partial patch path.
use sqlx::{Row, SqlitePool};

use crate::error::{CoreError, CoreResult};
use crate::models::audit::AuditAction;
use crate::models::configuration::{DeliveryConfigUpdate, DeliveryConfiguration, CONFIG_ID};
use crate::rbac::UserContext;
use crate::services::audit_service;

pub async fn get_configuration(
    pool: &SqlitePool,
) -> CoreResult<Option<DeliveryConfiguration>> {
    let row = sqlx::query(
        "SELECT smtp_host, smtp_port, smtp_user, smtp_credential, use_tls \
         FROM delivery_configuration WHERE id = ?",
    )
    .bind(CONFIG_ID)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else { return Ok(None) };

    let encoded: String = row.try_get("smtp_credential")?;
    let smtp_credential = DeliveryConfiguration::decode_credential(&encoded)
        .map_err(|e| CoreError::Persistence(format!("stored credential unreadable: {e}")))?;
    let port: i64 = row.try_get("smtp_port")?;

    Ok(Some(DeliveryConfiguration {
        smtp_host: row.try_get("smtp_host")?,
        smtp_port: port as u16,
        smtp_user: row.try_get("smtp_user")?,
        smtp_credential,
        use_tls: row.try_get("use_tls")?,
    }))
}

/// Replace the active configuration. Admin-only; every successful write is
/// audited.
pub async fn set_configuration(
    pool: &SqlitePool,
    actor: &UserContext,
    update: DeliveryConfigUpdate,
) -> CoreResult<DeliveryConfiguration> {
    if !actor.role.capabilities().manage_configuration {
        return Err(CoreError::Authorization(
            "delivery configuration is restricted to administrators".into(),
        ));
    }

    if update.smtp_host.trim().is_empty() {
        return Err(CoreError::Validation("SMTP host must not be empty".into()));
    }
    if update.smtp_user.trim().is_empty() {
        return Err(CoreError::Validation("SMTP username must not be empty".into()));
    }
    if update.smtp_credential.is_empty() {
        return Err(CoreError::Validation(
            "SMTP credential must not be empty".into(),
        ));
    }
    if update.smtp_port < 1 || update.smtp_port > 65535 {
        return Err(CoreError::Validation(format!(
            "SMTP port {} is out of range (1-65535)",
            update.smtp_port
        )));
    }

    let encoded = DeliveryConfiguration::encode_credential(&update.smtp_credential);
    sqlx::query(
        "INSERT OR REPLACE INTO delivery_configuration \
         (id, smtp_host, smtp_port, smtp_user, smtp_credential, use_tls) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(CONFIG_ID)
    .bind(&update.smtp_host)
    .bind(update.smtp_port as i64)
    .bind(&update.smtp_user)
    .bind(&encoded)
    .bind(update.use_tls)
    .execute(pool)
    .await?;

    audit_service::record(
        pool,
        Some(actor.user_id.as_str()),
        AuditAction::ConfigurationUpdated,
        &format!(
            "user '{}' updated SMTP settings ({}:{})",
            actor.user_id, update.smtp_host, update.smtp_port
        ),
    )
    .await;

    Ok(DeliveryConfiguration {
        smtp_host: update.smtp_host,
        smtp_port: update.smtp_port as u16,
        smtp_user: update.smtp_user,
        smtp_credential: update.smtp_credential,
        use_tls: update.use_tls,
    })
}
