//! Delegated user administration through the HTTP API.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use serde_json::json;

use opsdesk_admin::mocks::AccountCall;
use opsdesk_core::Role;
use opsdesk_integration_tests::TestApp;

#[tokio::test]
async fn test_create_user_delegates_and_writes_profile() {
    let app = TestApp::new();
    let admin = app.sign_in(Role::Admin).await;

    let (status, profile) = app
        .post(
            "/api/users",
            Some(&admin),
            json!({
                "email": "new.hire@example.com",
                "password": "s3cret-pass",
                "full_name": "New Hire",
                "role": "accountant",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(profile["role"], "accountant");
    assert_eq!(profile["email"], "new.hire@example.com");

    let calls = app.accounts.calls().await;
    assert_eq!(calls.len(), 1);
    assert!(matches!(
        &calls[0],
        AccountCall::Create { token, role: Role::Accountant, .. } if token == &admin
    ));

    let (_, users) = app.get("/api/users", Some(&admin)).await;
    assert_eq!(users.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_repeated_create_conflicts_without_second_account() {
    let app = TestApp::new();
    let admin = app.sign_in(Role::Admin).await;
    let body = json!({
        "email": "twice@example.com",
        "password": "long-enough",
        "full_name": "Twice",
    });

    let (status, _) = app.post("/api/users", Some(&admin), body.clone()).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app.post("/api/users", Some(&admin), body).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let creates = app
        .accounts
        .calls()
        .await
        .into_iter()
        .filter(|c| matches!(c, AccountCall::Create { .. }))
        .count();
    assert_eq!(creates, 1);
}

#[tokio::test]
async fn test_create_user_rejects_short_password() {
    let app = TestApp::new();
    let admin = app.sign_in(Role::Admin).await;

    let (status, _) = app
        .post(
            "/api/users",
            Some(&admin),
            json!({ "email": "a@example.com", "password": "123", "full_name": "A" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(app.accounts.calls().await.is_empty());
}

#[tokio::test]
async fn test_account_service_error_is_bad_gateway_with_message() {
    let app = TestApp::new();
    let admin = app.sign_in(Role::Admin).await;
    app.accounts.fail_with("email already registered").await;

    let (status, body) = app
        .post(
            "/api/users",
            Some(&admin),
            json!({
                "email": "dup@example.com",
                "password": "long-enough",
                "full_name": "Dup",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "email already registered");
}

#[tokio::test]
async fn test_delete_rules() {
    let app = TestApp::new();
    let (admin, admin_id) = app.sign_in_as(Role::Admin).await;
    let (_, other_admin) = app.sign_in_as(Role::Admin).await;
    let (_, member) = app.sign_in_as(Role::User).await;

    let (status, _) = app
        .request(Method::DELETE, &format!("/api/users/{admin_id}"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .request(Method::DELETE, &format!("/api/users/{other_admin}"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .request(Method::DELETE, &format!("/api/users/{member}"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let remaining = app.users.snapshot().await;
    assert!(remaining.iter().all(|p| p.id != member));
    assert_eq!(
        app.accounts.calls().await,
        vec![AccountCall::Delete {
            user: member,
            token: admin.clone(),
        }]
    );
}

#[tokio::test]
async fn test_reset_password_and_unknown_role_target() {
    let app = TestApp::new();
    let admin = app.sign_in(Role::Admin).await;
    let (_, member) = app.sign_in_as(Role::User).await;

    let (status, _) = app
        .post(
            &format!("/api/users/{member}/password"),
            Some(&admin),
            json!({ "new_password": "brand-new-pass" }),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .request(
            Method::PUT,
            &format!("/api/users/{}/role", uuid::Uuid::new_v4()),
            Some(&admin),
            Some(json!({ "role": "admin" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
