//! User and identity domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use opsdesk_core::{Email, Role, Section, UserId, has_access};

/// A dashboard user profile (domain type).
///
/// The identity itself is owned by the identity service; this record holds
/// what the dashboard needs on top of it.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    /// Identity id issued by the identity service.
    pub id: UserId,
    pub email: Email,
    pub full_name: String,
    /// The single role assigned to this user.
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Identity resolved from a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub id: UserId,
    pub email: Option<String>,
    pub full_name: Option<String>,
}

/// The acting user for one request: identity plus the role resolved for it.
///
/// Built fresh per request and passed explicitly into every permission check.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub identity: Identity,
    pub role: Role,
}

impl CurrentUser {
    #[must_use]
    pub const fn id(&self) -> UserId {
        self.identity.id
    }

    /// Whether this user may open `section`.
    #[must_use]
    pub fn can(&self, section: Section) -> bool {
        has_access(self.role, section)
    }
}

/// One navigation entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NavItem {
    pub section: Section,
    pub label: &'static str,
}

impl From<Section> for NavItem {
    fn from(section: Section) -> Self {
        Self {
            section,
            label: section.label(),
        }
    }
}

/// Parameters for writing a profile row.
#[derive(Debug, Clone)]
pub struct UpsertProfile {
    pub id: UserId,
    pub email: Email,
    pub full_name: String,
    pub role: Role,
}

/// Request body for creating a user through the account service.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    #[serde(default)]
    pub role: Role,
}

/// Request body for changing a user's role.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ChangeRoleRequest {
    pub role: Role,
}

/// Request body for a delegated password reset.
#[derive(Debug, Clone, Deserialize)]
pub struct ResetPasswordRequest {
    pub new_password: String,
}
