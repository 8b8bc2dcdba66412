//! Business logic services for the dashboard.
//!
//! # Services
//!
//! - `access` - Role resolution, section checks and navigation
//! - `assets` - Asset register and allocation lifecycle
//! - `users` - User administration
//! - `identity` - Identity service client (bearer token → identity)
//! - `accounts` - Trusted account-management client

pub mod access;
pub mod accounts;
pub mod assets;
pub mod error;
pub mod identity;
pub mod users;

pub use access::{AccessResolver, navigation, require_section};
pub use accounts::{AccountService, AccountServiceClient, AccountServiceError, NewAccount};
pub use assets::AssetLifecycle;
pub use error::ServiceError;
pub use identity::{IdentityClient, IdentityError, IdentityProvider};
pub use users::UserAdministration;
