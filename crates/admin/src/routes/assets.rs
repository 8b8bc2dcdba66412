//! Asset register endpoints.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use tracing::instrument;

use opsdesk_core::{AssetAction, AssetId};

use crate::error::AppError;
use crate::middleware::{AppJson, AppPath, AppQuery, RequireUser};
use crate::models::{Asset, AssetDetail, AssetFilter, AssetInput};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/assets", get(list).post(create))
        .route("/api/assets/{id}", get(show).put(update))
        .route("/api/assets/{id}/transitions", post(transition))
}

#[instrument(skip(auth, state))]
async fn list(
    auth: RequireUser,
    State(state): State<AppState>,
    AppQuery(filter): AppQuery<AssetFilter>,
) -> Result<Json<Vec<Asset>>, AppError> {
    let assets = state.assets().list_assets(&auth.user, &filter).await?;
    Ok(Json(assets))
}

async fn create(
    auth: RequireUser,
    State(state): State<AppState>,
    AppJson(input): AppJson<AssetInput>,
) -> Result<(StatusCode, Json<Asset>), AppError> {
    let asset = state.assets().create_asset(&auth.user, input).await?;
    Ok((StatusCode::CREATED, Json(asset)))
}

async fn show(
    auth: RequireUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> Result<Json<AssetDetail>, AppError> {
    let detail = state
        .assets()
        .get_asset(&auth.user, AssetId::new(id))
        .await?;
    Ok(Json(detail))
}

async fn update(
    auth: RequireUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
    AppJson(input): AppJson<AssetInput>,
) -> Result<Json<Asset>, AppError> {
    let asset = state
        .assets()
        .update_asset(&auth.user, AssetId::new(id), input)
        .await?;
    Ok(Json(asset))
}

/// Body is the action, e.g. `{"action": "dispose"}`.
async fn transition(
    auth: RequireUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
    AppJson(action): AppJson<AssetAction>,
) -> Result<Json<Asset>, AppError> {
    let asset = state
        .assets()
        .transition(&auth.user, AssetId::new(id), action)
        .await?;
    Ok(Json(asset))
}
