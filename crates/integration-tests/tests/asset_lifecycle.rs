//! Asset register and allocation lifecycle through the HTTP API.

#![allow(clippy::unwrap_used)]

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;

use opsdesk_core::{AssetId, Role};
use opsdesk_integration_tests::{TestApp, date};

async fn allocate(app: &TestApp, token: &str, asset_id: i64) -> (StatusCode, serde_json::Value) {
    app.post(
        "/api/allocations",
        Some(token),
        json!({
            "asset_id": asset_id,
            "holder_id": Uuid::new_v4(),
            "purpose": "site survey",
        }),
    )
    .await
}

#[tokio::test]
async fn test_allocate_then_return_in_good_condition() {
    let app = TestApp::with_today(date(2026, 3, 10));
    let token = app.sign_in(Role::ProjectManager).await;
    let asset_id = app.create_asset(&token, "EQ-001").await;

    let (status, allocation) = allocate(&app, &token, asset_id).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(allocation["status"], "active");
    assert_eq!(allocation["effective_status"], "active");
    assert_eq!(allocation["allocation_date"], "2026-03-10");

    let (_, asset) = app.get(&format!("/api/assets/{asset_id}"), Some(&token)).await;
    assert_eq!(asset["status"], "allocated");
    assert_eq!(asset["open_allocation"]["id"], allocation["id"]);

    let allocation_id = allocation["id"].as_i64().unwrap();
    let (status, returned) = app
        .post(
            &format!("/api/allocations/{allocation_id}/return"),
            Some(&token),
            json!({ "condition": "good", "reusability_percentage": 90 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(returned["status"], "returned");
    assert_eq!(returned["actual_return_date"], "2026-03-10");
    assert_eq!(returned["return_condition"], "good");
    assert_eq!(returned["reusability_percentage"], 90);

    let (_, asset) = app.get(&format!("/api/assets/{asset_id}"), Some(&token)).await;
    assert_eq!(asset["status"], "in_stock");
    assert!(asset["open_allocation"].is_null());
}

#[tokio::test]
async fn test_damaged_return_sends_asset_to_maintenance() {
    let app = TestApp::new();
    let token = app.sign_in(Role::Admin).await;
    let asset_id = app.create_asset(&token, "EQ-002").await;
    let (_, allocation) = allocate(&app, &token, asset_id).await;
    let allocation_id = allocation["id"].as_i64().unwrap();

    let (status, _) = app
        .post(
            &format!("/api/allocations/{allocation_id}/return"),
            Some(&token),
            json!({ "condition": "damaged", "reusability_percentage": 20 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, asset) = app.get(&format!("/api/assets/{asset_id}"), Some(&token)).await;
    assert_eq!(asset["status"], "under_maintenance");

    // Maintenance loop back to stock is operator driven
    let uri = format!("/api/assets/{asset_id}/transitions");
    let (status, asset) = app
        .post(&uri, Some(&token), json!({ "action": "mark_ready" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(asset["status"], "ready_for_reallocation");

    let (_, asset) = app.post(&uri, Some(&token), json!({ "action": "restock" })).await;
    assert_eq!(asset["status"], "in_stock");
}

#[tokio::test]
async fn test_second_allocation_conflicts() {
    let app = TestApp::new();
    let token = app.sign_in(Role::ProjectManager).await;
    let asset_id = app.create_asset(&token, "EQ-003").await;

    let (status, _) = allocate(&app, &token, asset_id).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = allocate(&app, &token, asset_id).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("open allocation"));

    assert_eq!(
        app.assets
            .open_allocation_count(AssetId::new(i32::try_from(asset_id).unwrap()))
            .await,
        1
    );
}

#[tokio::test]
async fn test_concurrent_allocations_admit_exactly_one() {
    let app = TestApp::new();
    let token = app.sign_in(Role::ProjectManager).await;
    let asset_id = app.create_asset(&token, "EQ-RACE").await;

    let mut handles = Vec::new();
    for _ in 0..16 {
        let router = app.router.clone();
        let body = json!({
            "asset_id": asset_id,
            "holder_id": Uuid::new_v4(),
            "purpose": "race",
        });
        let token = token.clone();
        handles.push(tokio::spawn(async move {
            let request = Request::builder()
                .method(Method::POST)
                .uri("/api/allocations")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap();
            router.oneshot(request).await.unwrap().status()
        }));
    }

    let mut created = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            StatusCode::CREATED => created += 1,
            StatusCode::CONFLICT => conflicts += 1,
            other => panic!("unexpected status {other}"),
        }
    }
    assert_eq!(created, 1);
    assert_eq!(conflicts, 15);
    assert_eq!(
        app.assets
            .open_allocation_count(AssetId::new(i32::try_from(asset_id).unwrap()))
            .await,
        1
    );
}

#[tokio::test]
async fn test_returning_a_closed_allocation_is_invalid_state() {
    let app = TestApp::new();
    let token = app.sign_in(Role::ProjectManager).await;
    let asset_id = app.create_asset(&token, "EQ-004").await;
    let (_, allocation) = allocate(&app, &token, asset_id).await;
    let uri = format!("/api/allocations/{}/return", allocation["id"]);
    let body = json!({ "condition": "fair", "reusability_percentage": 70 });

    let (status, _) = app.post(&uri, Some(&token), body.clone()).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.post(&uri, Some(&token), body).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_missing_records_are_not_found() {
    let app = TestApp::new();
    let token = app.sign_in(Role::ProjectManager).await;

    let (status, _) = app.get("/api/assets/999", Some(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = allocate(&app, &token, 999).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .post(
            "/api/allocations/999/return",
            Some(&token),
            json!({ "condition": "good", "reusability_percentage": 100 }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_disposed_asset_cannot_be_allocated() {
    let app = TestApp::new();
    let token = app.sign_in(Role::Admin).await;
    let asset_id = app.create_asset(&token, "EQ-005").await;

    let (status, asset) = app
        .post(
            &format!("/api/assets/{asset_id}/transitions"),
            Some(&token),
            json!({ "action": "dispose" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(asset["status"], "disposed");

    let (status, _) = allocate(&app, &token, asset_id).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_allocated_asset_cannot_be_disposed() {
    let app = TestApp::new();
    let token = app.sign_in(Role::Admin).await;
    let asset_id = app.create_asset(&token, "EQ-006").await;
    allocate(&app, &token, asset_id).await;

    let (status, _) = app
        .post(
            &format!("/api/assets/{asset_id}/transitions"),
            Some(&token),
            json!({ "action": "dispose" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_allocate_validation() {
    let app = TestApp::new();
    let token = app.sign_in(Role::ProjectManager).await;
    let asset_id = app.create_asset(&token, "EQ-007").await;

    let (status, _) = app
        .post(
            "/api/allocations",
            Some(&token),
            json!({ "asset_id": asset_id, "holder_id": Uuid::new_v4(), "purpose": "  " }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/api/allocations",
            Some(&token),
            json!({
                "asset_id": asset_id,
                "holder_id": Uuid::new_v4(),
                "purpose": "trip",
                "allocation_date": "2026-03-10",
                "expected_return_date": "2026-03-01",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_overdue_is_derived_from_expected_return_date() {
    let app = TestApp::with_today(date(2026, 3, 20));
    let token = app.sign_in(Role::ProjectManager).await;
    let late = app.create_asset(&token, "EQ-LATE").await;
    let on_time = app.create_asset(&token, "EQ-OK").await;

    for (asset_id, expected) in [(late, "2026-03-15"), (on_time, "2026-03-25")] {
        let (status, _) = app
            .post(
                "/api/allocations",
                Some(&token),
                json!({
                    "asset_id": asset_id,
                    "holder_id": Uuid::new_v4(),
                    "purpose": "fieldwork",
                    "allocation_date": "2026-03-01",
                    "expected_return_date": expected,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, rows) = app.get("/api/allocations?overdue=true", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["asset_id"], late);
    assert_eq!(rows[0]["status"], "active");
    assert_eq!(rows[0]["effective_status"], "overdue");

    let (_, all) = app.get("/api/allocations", Some(&token)).await;
    assert_eq!(all.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_asset_list_filters_and_duplicate_code() {
    let app = TestApp::new();
    let token = app.sign_in(Role::Admin).await;
    app.create_asset(&token, "DRILL-1").await;
    app.create_asset(&token, "SAW-1").await;

    let (status, rows) = app.get("/api/assets?q=drill", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["asset_code"], "DRILL-1");

    let (status, _) = app
        .post(
            "/api/assets",
            Some(&token),
            json!({ "asset_code": "DRILL-1", "sku": "X", "name": "Another drill" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_update_keeps_status() {
    let app = TestApp::new();
    let token = app.sign_in(Role::Admin).await;
    let asset_id = app.create_asset(&token, "EQ-008").await;
    allocate(&app, &token, asset_id).await;

    let (status, asset) = app
        .request(
            Method::PUT,
            &format!("/api/assets/{asset_id}"),
            Some(&token),
            Some(json!({
                "asset_code": "EQ-008",
                "sku": "SKU-NEW",
                "name": "Renamed",
                "cost_center": "CC-9",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(asset["name"], "Renamed");
    assert_eq!(asset["status"], "allocated");
}

#[tokio::test]
async fn test_malformed_input_gets_json_bad_request() {
    let app = TestApp::new();
    let token = app.sign_in(Role::ProjectManager).await;
    let asset_id = app.create_asset(&token, "EQ-009").await;
    let (_, allocation) = allocate(&app, &token, asset_id).await;

    // Out of range for the percentage type
    let (status, body) = app
        .post(
            &format!("/api/allocations/{}/return", allocation["id"]),
            Some(&token),
            json!({ "condition": "good", "reusability_percentage": 300 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = app.get("/api/assets/not-a-number", Some(&token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = app.get("/api/assets?status=lost", Some(&token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = app
        .post(
            &format!("/api/assets/{asset_id}/transitions"),
            Some(&token),
            json!({ "action": "teleport" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_activate_through_transitions() {
    let app = TestApp::new();
    let token = app.sign_in(Role::ProjectManager).await;
    let asset_id = app.create_asset(&token, "EQ-010").await;
    let uri = format!("/api/assets/{asset_id}/transitions");

    let (status, asset) = app.post(&uri, Some(&token), json!({ "action": "activate" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(asset["status"], "active");

    // Active assets can still be allocated
    let (status, _) = allocate(&app, &token, asset_id).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app.post(&uri, Some(&token), json!({ "action": "activate" })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}
