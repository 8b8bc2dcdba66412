//! Current user and section access.

use axum::{Json, Router, routing::get};
use serde::Serialize;

use opsdesk_core::{Role, has_access_str};

use crate::middleware::{AppPath, RequireUser};
use crate::models::{Identity, NavItem};
use crate::services::navigation;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/me", get(me))
        .route("/api/access/{section}", get(access))
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub identity: Identity,
    pub role: Role,
    pub role_label: &'static str,
    pub navigation: Vec<NavItem>,
}

#[derive(Debug, Serialize)]
pub struct AccessResponse {
    pub section: String,
    pub allowed: bool,
}

/// Who the caller is and which sections they see.
async fn me(RequireUser { user, .. }: RequireUser) -> Json<MeResponse> {
    Json(MeResponse {
        navigation: navigation(user.role),
        role_label: user.role.label(),
        role: user.role,
        identity: user.identity,
    })
}

/// Whether the caller may open `section`. Unknown sections are denied.
async fn access(
    RequireUser { user, .. }: RequireUser,
    AppPath(section): AppPath<String>,
) -> Json<AccessResponse> {
    let allowed = has_access_str(Some(user.role.as_str()), &section);
    Json(AccessResponse { section, allowed })
}
