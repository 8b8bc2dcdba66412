//! Middleware and extractors for the dashboard API.

pub mod auth;
pub mod extract;

pub use auth::{RequireAdmin, RequireUser};
pub use extract::{AppJson, AppPath, AppQuery};
