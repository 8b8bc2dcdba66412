//! Dashboard sections.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Error returned when a string is not one of the known section identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown section: {0}")]
pub struct SectionParseError(pub String);

/// One navigable area of the dashboard.
///
/// The set is closed; identifiers are kebab-case (`closed-projects`,
/// `admin-users`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Section {
    Overview,
    Projects,
    ClosedProjects,
    Tasks,
    Hr,
    Accounting,
    Inventory,
    Reports,
    Settings,
    AdminUsers,
}

impl Section {
    /// All sections in navigation order.
    pub const ALL: [Self; 10] = [
        Self::Overview,
        Self::Projects,
        Self::ClosedProjects,
        Self::Tasks,
        Self::Hr,
        Self::Accounting,
        Self::Inventory,
        Self::Reports,
        Self::Settings,
        Self::AdminUsers,
    ];

    /// Stable section identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Overview => "overview",
            Self::Projects => "projects",
            Self::ClosedProjects => "closed-projects",
            Self::Tasks => "tasks",
            Self::Hr => "hr",
            Self::Accounting => "accounting",
            Self::Inventory => "inventory",
            Self::Reports => "reports",
            Self::Settings => "settings",
            Self::AdminUsers => "admin-users",
        }
    }

    /// Navigation label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Overview => "Overview",
            Self::Projects => "Projects",
            Self::ClosedProjects => "Closed Projects",
            Self::Tasks => "Tasks",
            Self::Hr => "Human Resources",
            Self::Accounting => "Accounting",
            Self::Inventory => "Inventory",
            Self::Reports => "Reports",
            Self::Settings => "Settings",
            Self::AdminUsers => "User Accounts",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Section {
    type Err = SectionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|section| section.as_str() == s)
            .ok_or_else(|| SectionParseError(s.to_owned()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_identifiers_match_serde() {
        for section in Section::ALL {
            assert_eq!(section.as_str().parse::<Section>().unwrap(), section);
            assert_eq!(
                serde_json::to_string(&section).unwrap(),
                format!("\"{section}\"")
            );
        }
    }

    #[test]
    fn test_unknown_section() {
        assert!("payroll".parse::<Section>().is_err());
        assert!("closed_projects".parse::<Section>().is_err());
    }
}
