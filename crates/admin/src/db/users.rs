//! User profile storage.
//!
//! One row per identity in `app.user_profile`. The role column is the single
//! source of truth for a user's permissions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use opsdesk_core::{Email, Role, UserId};

use super::{RepositoryError, conflict_on_unique};
use crate::models::{UpsertProfile, UserProfile};

/// Storage for user profiles and role assignments.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Stored role for an identity, `None` when no profile exists.
    async fn get_role(&self, id: UserId) -> Result<Option<Role>, RepositoryError>;

    async fn get_profile(&self, id: UserId) -> Result<Option<UserProfile>, RepositoryError>;

    /// Profile holding `email`, if any.
    async fn get_profile_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<UserProfile>, RepositoryError>;

    /// All profiles, newest first.
    async fn list_profiles(&self) -> Result<Vec<UserProfile>, RepositoryError>;

    /// Insert a profile or overwrite email, name and role of an existing one.
    async fn upsert_profile(&self, profile: &UpsertProfile)
    -> Result<UserProfile, RepositoryError>;

    /// Change the role of an existing profile.
    ///
    /// Returns `RepositoryError::NotFound` if there is no profile.
    async fn set_role(&self, id: UserId, role: Role) -> Result<UserProfile, RepositoryError>;

    /// Remove a profile. Returns whether a row was deleted.
    async fn delete_profile(&self, id: UserId) -> Result<bool, RepositoryError>;
}

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct UserProfileRow {
    id: Uuid,
    email: String,
    full_name: String,
    role: Role,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserProfileRow> for UserProfile {
    type Error = RepositoryError;

    fn try_from(row: UserProfileRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: UserId::new(row.id),
            email,
            full_name: row.full_name,
            role: row.role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const PROFILE_COLUMNS: &str = "id, email, full_name, role, created_at, updated_at";

// =============================================================================
// Repository
// =============================================================================

/// `PostgreSQL` implementation of [`UserDirectory`].
#[derive(Clone)]
pub struct UserProfileRepository {
    pool: PgPool,
}

impl UserProfileRepository {
    /// Create a new user profile repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for UserProfileRepository {
    async fn get_role(&self, id: UserId) -> Result<Option<Role>, RepositoryError> {
        let role = sqlx::query_scalar::<_, Role>("SELECT role FROM app.user_profile WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(role)
    }

    async fn get_profile(&self, id: UserId) -> Result<Option<UserProfile>, RepositoryError> {
        let row = sqlx::query_as::<_, UserProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM app.user_profile WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn get_profile_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<UserProfile>, RepositoryError> {
        let row = sqlx::query_as::<_, UserProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM app.user_profile WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list_profiles(&self) -> Result<Vec<UserProfile>, RepositoryError> {
        let rows = sqlx::query_as::<_, UserProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM app.user_profile ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn upsert_profile(
        &self,
        profile: &UpsertProfile,
    ) -> Result<UserProfile, RepositoryError> {
        let row = sqlx::query_as::<_, UserProfileRow>(&format!(
            r"
            INSERT INTO app.user_profile (id, email, full_name, role)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE
            SET email = EXCLUDED.email,
                full_name = EXCLUDED.full_name,
                role = EXCLUDED.role,
                updated_at = NOW()
            RETURNING {PROFILE_COLUMNS}
            "
        ))
        .bind(profile.id)
        .bind(profile.email.as_str())
        .bind(&profile.full_name)
        .bind(profile.role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "email already belongs to another user"))?;

        row.try_into()
    }

    async fn set_role(&self, id: UserId, role: Role) -> Result<UserProfile, RepositoryError> {
        let row = sqlx::query_as::<_, UserProfileRow>(&format!(
            r"
            UPDATE app.user_profile
            SET role = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {PROFILE_COLUMNS}
            "
        ))
        .bind(id)
        .bind(role)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    async fn delete_profile(&self, id: UserId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM app.user_profile WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
