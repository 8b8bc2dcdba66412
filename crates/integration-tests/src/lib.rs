//! Integration test harness for Opsdesk.
//!
//! [`TestApp`] builds the real axum router on top of the in-memory stores and
//! service fakes from `opsdesk_admin::mocks`, so tests drive the full HTTP
//! stack (extractors, role resolution, services, error mapping) without a
//! database or network.
//!
//! ```rust,ignore
//! let app = TestApp::new();
//! let token = app.sign_in(Role::ProjectManager).await;
//! let (status, body) = app.get("/api/me", Some(&token)).await;
//! ```

#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use chrono::NaiveDate;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use opsdesk_admin::db::UserDirectory;
use opsdesk_admin::mocks::{
    InMemoryAssetStore, InMemoryUserDirectory, RecordingAccountService, StaticIdentityProvider,
};
use opsdesk_admin::models::{Identity, UpsertProfile};
use opsdesk_admin::services::AssetLifecycle;
use opsdesk_admin::state::AppState;
use opsdesk_core::{Email, Role, UserId};

/// The router plus handles on every fake behind it.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub users: InMemoryUserDirectory,
    pub assets: InMemoryAssetStore,
    pub identity: StaticIdentityProvider,
    pub accounts: RecordingAccountService,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    #[must_use]
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Pin the date used for defaults and overdue derivation.
    #[must_use]
    pub fn with_today(today: NaiveDate) -> Self {
        Self::build(Some(today))
    }

    fn build(today: Option<NaiveDate>) -> Self {
        let users = InMemoryUserDirectory::new();
        let assets = InMemoryAssetStore::new();
        let identity = StaticIdentityProvider::new();
        let accounts = RecordingAccountService::new();

        let mut lifecycle = AssetLifecycle::new(Arc::new(assets.clone()));
        if let Some(today) = today {
            lifecycle = lifecycle.with_today(today);
        }

        let state = AppState::with_lifecycle(
            Arc::new(users.clone()),
            Arc::new(assets.clone()),
            Arc::new(identity.clone()),
            Arc::new(accounts.clone()),
            lifecycle,
        );

        Self {
            router: opsdesk_admin::app(state.clone()),
            state,
            users,
            assets,
            identity,
            accounts,
        }
    }

    /// Register a fresh identity with a stored `role` and return its token.
    pub async fn sign_in(&self, role: Role) -> String {
        self.sign_in_as(role).await.0
    }

    /// Like [`Self::sign_in`], also returning the identity id.
    pub async fn sign_in_as(&self, role: Role) -> (String, UserId) {
        let (token, id) = self.sign_in_without_profile().await;
        let email = format!("{}@example.com", id.as_uuid().simple());
        self.users
            .upsert_profile(&UpsertProfile {
                id,
                email: Email::parse(&email).unwrap(),
                full_name: format!("{role} user"),
                role,
            })
            .await
            .unwrap();
        (token, id)
    }

    /// Register an identity that has no profile row.
    pub async fn sign_in_without_profile(&self) -> (String, UserId) {
        let id = UserId::new(Uuid::new_v4());
        let token = format!("token-{}", id.as_uuid().simple());
        self.identity
            .insert(
                &token,
                Identity {
                    id,
                    email: None,
                    full_name: None,
                },
            )
            .await;
        (token, id)
    }

    /// Send a request and return the status and JSON body (`Null` if empty).
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    /// Create an asset through the API and return its id.
    pub async fn create_asset(&self, token: &str, code: &str) -> i64 {
        let (status, body) = self
            .post(
                "/api/assets",
                Some(token),
                serde_json::json!({
                    "asset_code": code,
                    "sku": format!("SKU-{code}"),
                    "name": format!("Asset {code}"),
                    "asset_type": "equipment",
                    "cost_basis": "1200.00",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create asset failed: {body}");
        body["id"].as_i64().unwrap()
    }
}

/// Build a date in tests.
#[must_use]
pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}
