//! Allocation endpoints.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};

use opsdesk_core::AllocationId;

use crate::error::AppError;
use crate::middleware::{AppJson, AppPath, AppQuery, RequireUser};
use crate::models::{AllocateRequest, AllocationFilter, AllocationView, ReturnRequest};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/allocations", get(list).post(allocate))
        .route("/api/allocations/{id}/return", post(return_asset))
}

async fn list(
    auth: RequireUser,
    State(state): State<AppState>,
    AppQuery(filter): AppQuery<AllocationFilter>,
) -> Result<Json<Vec<AllocationView>>, AppError> {
    let rows = state.assets().list_allocations(&auth.user, &filter).await?;
    Ok(Json(rows))
}

/// Allocate an asset. 409 if it already has an open allocation.
async fn allocate(
    auth: RequireUser,
    State(state): State<AppState>,
    AppJson(request): AppJson<AllocateRequest>,
) -> Result<(StatusCode, Json<AllocationView>), AppError> {
    let view = state.assets().allocate(&auth.user, request).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// Return an allocated asset. 422 if the allocation is not open.
async fn return_asset(
    auth: RequireUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
    AppJson(request): AppJson<ReturnRequest>,
) -> Result<Json<AllocationView>, AppError> {
    let view = state
        .assets()
        .return_asset(&auth.user, AllocationId::new(id), request)
        .await?;
    Ok(Json(view))
}
