//! HTTP route handlers for the dashboard API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          liveness
//! GET  /health/ready                    storage reachable
//! GET  /api/me                          identity, role, navigation
//! GET  /api/access/{section}            single section check
//! GET  /api/assets                      list assets
//! POST /api/assets                      register asset
//! GET  /api/assets/{id}                 asset + open allocation
//! PUT  /api/assets/{id}                 edit master data
//! POST /api/assets/{id}/transitions     operator status change
//! GET  /api/allocations                 list allocations
//! POST /api/allocations                 allocate
//! POST /api/allocations/{id}/return     return
//! GET  /api/users                       list users
//! POST /api/users                       create user (delegated)
//! PUT  /api/users/{id}/role             change role
//! POST /api/users/{id}/password         reset password (delegated)
//! DELETE /api/users/{id}                delete user (delegated)
//! ```

pub mod allocations;
pub mod assets;
pub mod health;
pub mod me;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Build the complete router, without outer layers.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(me::router())
        .merge(assets::router())
        .merge(allocations::router())
        .merge(users::router())
}
