//! Dashboard roles.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Error returned when a string is not a known role.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid role: {0}")]
pub struct RoleParseError(pub String);

/// The permission profile assigned to a user.
///
/// Every user has exactly one role. A user without a stored role is treated
/// as [`Role::User`], the most restrictive profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "app.app_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full access, including user administration.
    Admin,
    /// Accounting, inventory and project figures.
    Accountant,
    /// Staff records and task assignment.
    HrAdmin,
    /// Projects, tasks and the inventory they consume.
    ProjectManager,
    /// Basic account: overview only.
    #[default]
    User,
}

impl Role {
    /// All roles, most privileged first.
    pub const ALL: [Self; 5] = [
        Self::Admin,
        Self::Accountant,
        Self::HrAdmin,
        Self::ProjectManager,
        Self::User,
    ];

    /// Stable identifier used on the wire and in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Accountant => "accountant",
            Self::HrAdmin => "hr_admin",
            Self::ProjectManager => "project_manager",
            Self::User => "user",
        }
    }

    /// Human-readable label for navigation headers and user lists.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Admin => "Administrator",
            Self::Accountant => "Accountant",
            Self::HrAdmin => "HR Administrator",
            Self::ProjectManager => "Project Manager",
            Self::User => "User",
        }
    }

    /// Resolve an optional stored role string, falling back to [`Role::User`]
    /// when it is missing or unrecognized.
    #[must_use]
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        raw.and_then(|s| s.parse().ok()).unwrap_or_default()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| RoleParseError(s.to_owned()))
    }
}
