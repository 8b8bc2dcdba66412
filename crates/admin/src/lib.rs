//! Opsdesk dashboard library.
//!
//! The binary in `main.rs` only wires configuration, logging and the server
//! around [`app`]; everything else lives here so it can be tested without a
//! network listener.
//!
//! # Security
//!
//! Every `/api` route resolves the caller's bearer token through the identity
//! service and checks the caller's role against the section policy in
//! `opsdesk-core`. Account creation, deletion and password resets are
//! delegated to the trusted account service with the caller's token.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::Router;

use state::AppState;

/// Build the application router with its state attached.
///
/// Outer layers (tracing, Sentry) are added by the binary.
pub fn app(state: AppState) -> Router {
    routes::routes().with_state(state)
}
