#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use mailagenda::db;
use mailagenda::models::scheduled_email::NewScheduleRequest;
use mailagenda::rbac::{Role, UserContext};
use mailagenda::services::auth_service::{AuthError, AuthGateway, AuthSession};

/// Password the stub gateway accepts for every identity.
pub const TEST_PASSWORD: &str = "pass123456";

pub async fn test_pool() -> SqlitePool {
    mailagenda::telemetry::init();
    // Single connection so every statement sees the same in-memory database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory pool");
    db::run_migrations(&pool).await.expect("migrations");
    pool
}

pub fn standard_user(id: &str) -> UserContext {
    UserContext::new(id, Role::Standard)
}

pub fn admin_user(id: &str) -> UserContext {
    UserContext::new(id, Role::Admin)
}

/// A valid compose request due one hour from now.
pub fn draft_in_one_hour() -> NewScheduleRequest {
    draft_at(Utc::now() + Duration::hours(1))
}

pub fn draft_at(scheduled_at: DateTime<Utc>) -> NewScheduleRequest {
    NewScheduleRequest {
        sender: "noreply@acme.test".into(),
        recipients: vec!["a@x.com".into()],
        cc: vec![],
        subject: "Quarterly report".into(),
        body: "<p>Numbers attached.</p>".into(),
        scheduled_at,
    }
}

/// In-memory stand-in for the external auth service: accepts
/// [`TEST_PASSWORD`] for every identity and derives stable ids from the
/// login address.
pub struct StubGateway;

impl StubGateway {
    pub fn identity_for(email: &str) -> String {
        format!("auth_{}", email.replace(['@', '.'], "_"))
    }
}

impl AuthGateway for StubGateway {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        if password == TEST_PASSWORD {
            Ok(AuthSession {
                user_id: Self::identity_for(email),
                email: email.to_string(),
            })
        } else {
            Err(AuthError("bad credentials".into()))
        }
    }

    async fn sign_up(&self, email: &str, _password: &str) -> Result<String, AuthError> {
        Ok(Self::identity_for(email))
    }
}
