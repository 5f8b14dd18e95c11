/// Registration and sign-in against the external auth service. The gateway
/// owns credentials and sessions; this side keeps the profile row (name,
/// login address, role) and the audit trail around both operations.
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use thiserror::Error;

use crate::db::{format_ts, parse_ts};
use crate::error::{CoreError, CoreResult};
use crate::models::audit::AuditAction;
use crate::models::user::User;
use crate::rbac::{Role, UserContext};
use crate::services::audit_service;

#[derive(Debug, Error)]
#[error("authentication rejected: {0}")]
pub struct AuthError(pub String);

/// Session as returned by the auth backend.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user_id: String,
    pub email: String,
}

/// Seam for the external backend-as-a-service holding credentials.
pub trait AuthGateway {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError>;

    /// Create a new identity, returning its id.
    async fn sign_up(&self, email: &str, password: &str) -> Result<String, AuthError>;
}

/// Create the auth identity and the local profile row. The role is fixed
/// here; nothing in this subsystem changes it afterwards.
pub async fn register<G: AuthGateway>(
    pool: &SqlitePool,
    gateway: &G,
    name: &str,
    login_email: &str,
    password: &str,
    role: Role,
) -> CoreResult<User> {
    if name.trim().is_empty() {
        return Err(CoreError::Validation("name must not be empty".into()));
    }
    if login_email.parse::<lettre::Address>().is_err() {
        return Err(CoreError::Validation(format!(
            "invalid login address '{login_email}'"
        )));
    }
    if password.len() < 6 {
        return Err(CoreError::Validation(
            "password must be at least 6 characters".into(),
        ));
    }

    let existing = sqlx::query("SELECT id FROM users WHERE login_email = ?")
        .bind(login_email)
        .fetch_optional(pool)
        .await?;
    if existing.is_some() {
        return Err(CoreError::Validation(format!(
            "login address '{login_email}' is already registered"
        )));
    }

    let user_id = gateway
        .sign_up(login_email, password)
        .await
        .map_err(|e| CoreError::Authorization(e.to_string()))?;

    let user = User {
        id: user_id,
        name: name.to_string(),
        login_email: login_email.to_string(),
        role,
        created_at: Utc::now(),
    };

    sqlx::query(
        "INSERT INTO users (id, name, login_email, role, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&user.id)
    .bind(&user.name)
    .bind(&user.login_email)
    .bind(user.role.as_str())
    .bind(format_ts(&user.created_at))
    .execute(pool)
    .await?;

    audit_service::record(
        pool,
        Some(user.id.as_str()),
        AuditAction::RegisteredAccount,
        &format!(
            "new user '{}' ({}) registered with role '{}'",
            user.name,
            user.login_email,
            user.role.as_str()
        ),
    )
    .await;

    Ok(user)
}

/// Authenticate via the gateway and resolve the stored role into the caller
/// context every guarded operation takes.
pub async fn sign_in<G: AuthGateway>(
    pool: &SqlitePool,
    gateway: &G,
    login_email: &str,
    password: &str,
) -> CoreResult<UserContext> {
    let session = gateway
        .sign_in(login_email, password)
        .await
        .map_err(|e| CoreError::Authorization(e.to_string()))?;

    let user = get_user(pool, &session.user_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("user '{}'", session.user_id)))?;

    audit_service::record(
        pool,
        Some(user.id.as_str()),
        AuditAction::LoggedIn,
        &format!("user '{}' ({}) signed in", user.name, user.login_email),
    )
    .await;

    Ok(UserContext::new(user.id, user.role))
}

pub async fn get_user(pool: &SqlitePool, id: &str) -> CoreResult<Option<User>> {
    let row = sqlx::query("SELECT id, name, login_email, role, created_at FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(row_to_user).transpose()
}

fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> CoreResult<User> {
    let role_raw: String = row.try_get("role")?;
    let role = Role::from_str(&role_raw)
        .ok_or_else(|| CoreError::Persistence(format!("unknown role '{role_raw}'")))?;
    let created_at_raw: String = row.try_get("created_at")?;

    Ok(User {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        login_email: row.try_get("login_email")?,
        role,
        created_at: parse_ts(&created_at_raw)?,
    })
}
