//! Role resolution and section checks.
//!
//! The role is looked up on every request and carried in [`CurrentUser`];
//! nothing caches a "current role" between requests.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use opsdesk_core::{Role, Section, UserId, allowed_sections};

use super::ServiceError;
use crate::db::UserDirectory;
use crate::models::{CurrentUser, Identity, NavItem};

/// Reject unless `user`'s role grants `section`.
///
/// # Errors
///
/// Returns `ServiceError::Forbidden` naming the role and section.
pub fn require_section(user: &CurrentUser, section: Section) -> Result<(), ServiceError> {
    if user.can(section) {
        return Ok(());
    }
    debug!(user_id = %user.id(), role = %user.role, %section, "Section denied");
    Err(ServiceError::Forbidden {
        role: user.role,
        section,
    })
}

/// Navigation entries for `role`, in allow-list order.
#[must_use]
pub fn navigation(role: Role) -> Vec<NavItem> {
    allowed_sections(role)
        .iter()
        .copied()
        .map(NavItem::from)
        .collect()
}

/// Resolves identities to roles.
#[derive(Clone)]
pub struct AccessResolver {
    users: Arc<dyn UserDirectory>,
}

impl AccessResolver {
    #[must_use]
    pub fn new(users: Arc<dyn UserDirectory>) -> Self {
        Self { users }
    }

    /// Stored role for `id`.
    ///
    /// Falls back to [`Role::User`] when no profile exists, and also when the
    /// lookup itself fails, so a storage outage can only reduce access.
    #[instrument(skip(self), fields(user_id = %id))]
    pub async fn resolve_role(&self, id: UserId) -> Role {
        match self.users.get_role(id).await {
            Ok(Some(role)) => role,
            Ok(None) => {
                debug!("No profile stored, using default role");
                Role::default()
            }
            Err(e) => {
                warn!(error = %e, "Role lookup failed, using default role");
                Role::default()
            }
        }
    }

    /// Build the acting user for one request.
    pub async fn current_user(&self, identity: Identity) -> CurrentUser {
        let role = self.resolve_role(identity.id).await;
        CurrentUser { identity, role }
    }
}
