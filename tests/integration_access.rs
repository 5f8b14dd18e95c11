mod common;

use common::{admin_user, draft_in_one_hour, standard_user, test_pool, StubGateway, TEST_PASSWORD};
use mailagenda::error::CoreError;
use mailagenda::models::audit::AuditAction;
use mailagenda::models::scheduled_email::EmailStatus;
use mailagenda::rbac::Role;
use mailagenda::services::{audit_service, auth_service, schedule_service};

#[tokio::test]
async fn standard_listings_are_scoped_to_the_owner() {
    let pool = test_pool().await;
    let alice = standard_user("alice");
    let bob = standard_user("bob");
    let root = admin_user("root");

    schedule_service::create_schedule(&pool, &alice, draft_in_one_hour())
        .await
        .unwrap();
    schedule_service::create_schedule(&pool, &alice, draft_in_one_hour())
        .await
        .unwrap();
    schedule_service::create_schedule(&pool, &bob, draft_in_one_hour())
        .await
        .unwrap();

    let alice_pending = schedule_service::list_pending(&pool, &alice).await.unwrap();
    assert_eq!(alice_pending.len(), 2);
    assert!(alice_pending.iter().all(|e| e.owner_id == "alice"));

    let alice_history = schedule_service::list_history(&pool, &alice, None)
        .await
        .unwrap();
    assert_eq!(alice_history.len(), 2);

    let admin_history = schedule_service::list_history(&pool, &root, None)
        .await
        .unwrap();
    assert_eq!(admin_history.len(), 3);
}

#[tokio::test]
async fn history_filters_by_status() {
    let pool = test_pool().await;
    let alice = standard_user("alice");

    let kept = schedule_service::create_schedule(&pool, &alice, draft_in_one_hour())
        .await
        .unwrap();
    let dropped = schedule_service::create_schedule(&pool, &alice, draft_in_one_hour())
        .await
        .unwrap();
    schedule_service::cancel_schedule(&pool, &alice, &dropped.id)
        .await
        .unwrap();

    let cancelled =
        schedule_service::list_history(&pool, &alice, Some(EmailStatus::Cancelled))
            .await
            .unwrap();
    assert_eq!(cancelled.len(), 1);
    assert_eq!(cancelled[0].id, dropped.id);

    let scheduled =
        schedule_service::list_history(&pool, &alice, Some(EmailStatus::Scheduled))
            .await
            .unwrap();
    assert_eq!(scheduled.len(), 1);
    assert_eq!(scheduled[0].id, kept.id);
}

#[tokio::test]
async fn standard_caller_cannot_reach_another_users_record() {
    let pool = test_pool().await;
    let alice = standard_user("alice");
    let bob = standard_user("bob");
    let email = schedule_service::create_schedule(&pool, &bob, draft_in_one_hour())
        .await
        .unwrap();

    assert!(matches!(
        schedule_service::get_schedule(&pool, &alice, &email.id).await,
        Err(CoreError::NotFound(_))
    ));

    assert!(matches!(
        schedule_service::cancel_schedule(&pool, &alice, &email.id).await,
        Err(CoreError::Authorization(_))
    ));

    // The failed attempts left the record untouched.
    let after = schedule_service::get_schedule(&pool, &bob, &email.id)
        .await
        .unwrap();
    assert_eq!(after.status, EmailStatus::Scheduled);
}

#[tokio::test]
async fn admin_may_read_and_cancel_any_record() {
    let pool = test_pool().await;
    let bob = standard_user("bob");
    let root = admin_user("root");
    let email = schedule_service::create_schedule(&pool, &bob, draft_in_one_hour())
        .await
        .unwrap();

    let seen = schedule_service::get_schedule(&pool, &root, &email.id)
        .await
        .unwrap();
    assert_eq!(seen.id, email.id);

    let cancelled = schedule_service::cancel_schedule(&pool, &root, &email.id)
        .await
        .unwrap();
    assert_eq!(cancelled.status, EmailStatus::Cancelled);
}

#[tokio::test]
async fn audit_log_reads_are_admin_only() {
    let pool = test_pool().await;
    let alice = standard_user("alice");
    let root = admin_user("root");

    assert!(matches!(
        audit_service::list(&pool, &alice, Default::default()).await,
        Err(CoreError::Authorization(_))
    ));
    assert!(audit_service::list(&pool, &root, Default::default())
        .await
        .is_ok());
}

#[tokio::test]
async fn registration_creates_profile_and_audit_entry() {
    let pool = test_pool().await;
    let root = admin_user("root");

    let user = auth_service::register(
        &pool,
        &StubGateway,
        "Alice Prado",
        "alice@acme.test",
        TEST_PASSWORD,
        Role::Standard,
    )
    .await
    .unwrap();
    assert_eq!(user.role, Role::Standard);
    assert_eq!(user.login_email, "alice@acme.test");

    let stored = auth_service::get_user(&pool, &user.id).await.unwrap().unwrap();
    assert_eq!(stored, user);

    let entries = audit_service::list(
        &pool,
        &root,
        audit_service::AuditFilter {
            action: Some(AuditAction::RegisteredAccount),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].actor_id.as_deref(), Some(user.id.as_str()));
}

#[tokio::test]
async fn registration_rejects_duplicates_and_weak_input() {
    let pool = test_pool().await;

    auth_service::register(
        &pool,
        &StubGateway,
        "Alice Prado",
        "alice@acme.test",
        TEST_PASSWORD,
        Role::Standard,
    )
    .await
    .unwrap();

    // Same login address again
    assert!(matches!(
        auth_service::register(
            &pool,
            &StubGateway,
            "Alice Again",
            "alice@acme.test",
            TEST_PASSWORD,
            Role::Standard,
        )
        .await,
        Err(CoreError::Validation(_))
    ));

    // Short password
    assert!(matches!(
        auth_service::register(&pool, &StubGateway, "Bob", "bob@acme.test", "123", Role::Standard)
            .await,
        Err(CoreError::Validation(_))
    ));

    // Bad login address
    assert!(matches!(
        auth_service::register(
            &pool,
            &StubGateway,
            "Carol",
            "not-an-address",
            TEST_PASSWORD,
            Role::Standard,
        )
        .await,
        Err(CoreError::Validation(_))
    ));
}

#[tokio::test]
async fn sign_in_resolves_role_and_is_audited() {
    let pool = test_pool().await;
    let root = admin_user("root");

    let user = auth_service::register(
        &pool,
        &StubGateway,
        "Dona Admin",
        "dona@acme.test",
        TEST_PASSWORD,
        Role::Admin,
    )
    .await
    .unwrap();

    let ctx = auth_service::sign_in(&pool, &StubGateway, "dona@acme.test", TEST_PASSWORD)
        .await
        .unwrap();
    assert_eq!(ctx.user_id, user.id);
    assert_eq!(ctx.role, Role::Admin);
    assert!(ctx.is_admin());

    let logins = audit_service::list(
        &pool,
        &root,
        audit_service::AuditFilter {
            action: Some(AuditAction::LoggedIn),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(logins.len(), 1);

    // Rejected credentials leave no login entry behind.
    assert!(matches!(
        auth_service::sign_in(&pool, &StubGateway, "dona@acme.test", "wrong").await,
        Err(CoreError::Authorization(_))
    ));
    let logins = audit_service::list(
        &pool,
        &root,
        audit_service::AuditFilter {
            action: Some(AuditAction::LoggedIn),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(logins.len(), 1);
}
