//! User role commands.
//!
//! `grant` writes the profile row directly. It exists to bootstrap the first
//! administrator; afterwards roles are managed through the API.

use opsdesk_admin::db::{RepositoryError, UserDirectory, UserProfileRepository};
use opsdesk_admin::models::UpsertProfile;
use opsdesk_core::{Email, Role, UserId};
use thiserror::Error;
use uuid::Uuid;

use super::{CommandError, connect};

#[derive(Debug, Error)]
pub enum UserCommandError {
    #[error(transparent)]
    Connect(#[from] CommandError),

    #[error("Invalid role: {0}. Valid roles: admin, accountant, hr_admin, project_manager, user")]
    InvalidRole(String),

    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("Name must not be empty")]
    EmptyName,

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Create or update a profile with `role`.
pub async fn grant(
    user_id: Uuid,
    email: &str,
    name: &str,
    role: &str,
) -> Result<(), UserCommandError> {
    let role: Role = role
        .parse()
        .map_err(|_| UserCommandError::InvalidRole(role.to_owned()))?;
    let email = Email::parse(email).map_err(|_| UserCommandError::InvalidEmail(email.to_owned()))?;
    let full_name = name.trim();
    if full_name.is_empty() {
        return Err(UserCommandError::EmptyName);
    }

    let users = UserProfileRepository::new(connect().await?);
    let profile = users
        .upsert_profile(&UpsertProfile {
            id: UserId::new(user_id),
            email,
            full_name: full_name.to_owned(),
            role,
        })
        .await?;

    tracing::info!(
        "Granted {} to {} ({})",
        profile.role.label(),
        profile.email,
        profile.id
    );
    Ok(())
}

/// Log every profile, newest first.
pub async fn list() -> Result<(), UserCommandError> {
    let users = UserProfileRepository::new(connect().await?);
    let profiles = users.list_profiles().await?;

    if profiles.is_empty() {
        tracing::info!("No users found");
        return Ok(());
    }
    for profile in profiles {
        tracing::info!(
            "{}  {:<16} {:<32} {}",
            profile.id,
            profile.role.as_str(),
            profile.email,
            profile.full_name
        );
    }
    Ok(())
}
