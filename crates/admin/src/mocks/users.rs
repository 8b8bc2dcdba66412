//! In-memory [`UserDirectory`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use opsdesk_core::{Email, Role, UserId};

use crate::db::{RepositoryError, UserDirectory};
use crate::models::{UpsertProfile, UserProfile};

/// User directory backed by a vector in insertion order.
#[derive(Clone, Default)]
pub struct InMemoryUserDirectory {
    profiles: Arc<RwLock<Vec<UserProfile>>>,
    unavailable: Arc<AtomicBool>,
    read_only: Arc<AtomicBool>,
}

impl InMemoryUserDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with a database error, as if storage were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make writes fail with a database error while reads keep working.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    /// Gets a snapshot of all stored profiles.
    pub async fn snapshot(&self) -> Vec<UserProfile> {
        self.profiles.read().await.clone()
    }

    fn check_available(&self) -> Result<(), RepositoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    fn check_writable(&self) -> Result<(), RepositoryError> {
        self.check_available()?;
        if self.read_only.load(Ordering::SeqCst) {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn get_role(&self, id: UserId) -> Result<Option<Role>, RepositoryError> {
        self.check_available()?;
        let profiles = self.profiles.read().await;
        Ok(profiles.iter().find(|p| p.id == id).map(|p| p.role))
    }

    async fn get_profile(&self, id: UserId) -> Result<Option<UserProfile>, RepositoryError> {
        self.check_available()?;
        let profiles = self.profiles.read().await;
        Ok(profiles.iter().find(|p| p.id == id).cloned())
    }

    async fn get_profile_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<UserProfile>, RepositoryError> {
        self.check_available()?;
        let profiles = self.profiles.read().await;
        Ok(profiles.iter().find(|p| &p.email == email).cloned())
    }

    async fn list_profiles(&self) -> Result<Vec<UserProfile>, RepositoryError> {
        self.check_available()?;
        let profiles = self.profiles.read().await;
        Ok(profiles.iter().rev().cloned().collect())
    }

    async fn upsert_profile(
        &self,
        profile: &UpsertProfile,
    ) -> Result<UserProfile, RepositoryError> {
        self.check_writable()?;
        let mut profiles = self.profiles.write().await;

        if profiles
            .iter()
            .any(|p| p.id != profile.id && p.email == profile.email)
        {
            return Err(RepositoryError::Conflict(
                "email already belongs to another user".to_owned(),
            ));
        }

        let now = Utc::now();
        if let Some(existing) = profiles.iter_mut().find(|p| p.id == profile.id) {
            existing.email = profile.email.clone();
            existing.full_name.clone_from(&profile.full_name);
            existing.role = profile.role;
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let created = UserProfile {
            id: profile.id,
            email: profile.email.clone(),
            full_name: profile.full_name.clone(),
            role: profile.role,
            created_at: now,
            updated_at: now,
        };
        profiles.push(created.clone());
        Ok(created)
    }

    async fn set_role(&self, id: UserId, role: Role) -> Result<UserProfile, RepositoryError> {
        self.check_writable()?;
        let mut profiles = self.profiles.write().await;
        let profile = profiles
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(RepositoryError::NotFound)?;
        profile.role = role;
        profile.updated_at = Utc::now();
        Ok(profile.clone())
    }

    async fn delete_profile(&self, id: UserId) -> Result<bool, RepositoryError> {
        self.check_writable()?;
        let mut profiles = self.profiles.write().await;
        let before = profiles.len();
        profiles.retain(|p| p.id != id);
        Ok(profiles.len() != before)
    }
}
