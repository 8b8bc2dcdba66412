//! Opsdesk Core - Shared domain library.
//!
//! This crate provides the types and rules shared by every Opsdesk component:
//! - `admin` - The dashboard API service
//! - `cli` - Command-line tools for migrations and role administration
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Decisions that must be identical everywhere (which
//! role sees which section, which asset status follows which action) live here
//! so the service and the CLI cannot drift apart.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, email, roles, sections and status enums
//! - [`access`] - The fixed role → section policy table
//! - [`lifecycle`] - The asset state machine and overdue derivation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod access;
pub mod lifecycle;
pub mod types;

pub use access::{allowed_sections, has_access, has_access_str};
pub use lifecycle::{AssetAction, TransitionError};
pub use types::*;
