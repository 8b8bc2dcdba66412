//! User administration endpoints (`admin-users` section only).

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get, post, put},
};
use secrecy::SecretString;
use tracing::instrument;

use opsdesk_core::UserId;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::{AppJson, AppPath, RequireAdmin};
use crate::models::{ChangeRoleRequest, CreateUserRequest, ResetPasswordRequest, UserProfile};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(list).post(create))
        .route("/api/users/{id}", delete(delete_user))
        .route("/api/users/{id}/role", put(change_role))
        .route("/api/users/{id}/password", post(reset_password))
}

#[instrument(skip(admin, state))]
async fn list(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserProfile>>, AppError> {
    let users = state.users().list_users(&admin.user).await?;
    Ok(Json(users))
}

async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    AppJson(request): AppJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserProfile>), AppError> {
    let profile = state
        .users()
        .create_user(&admin.user, &admin.token, request)
        .await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

async fn change_role(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(request): AppJson<ChangeRoleRequest>,
) -> Result<Json<UserProfile>, AppError> {
    let profile = state
        .users()
        .change_role(&admin.user, UserId::new(id), request.role)
        .await?;
    Ok(Json(profile))
}

async fn reset_password(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(request): AppJson<ResetPasswordRequest>,
) -> Result<StatusCode, AppError> {
    state
        .users()
        .reset_password(
            &admin.user,
            &admin.token,
            UserId::new(id),
            SecretString::from(request.new_password),
        )
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_user(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<StatusCode, AppError> {
    state.users().delete_user(&admin.user, &admin.token, UserId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
