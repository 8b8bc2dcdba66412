//! Role-based access to dashboard sections.
//!
//! The policy is a fixed table: each [`Role`] maps to an ordered allow-list of
//! [`Section`]s. The order is the navigation order shown to that role. The
//! table is not data-driven and cannot be edited at runtime.
//!
//! Checks are pure functions of `(role, section)`; callers resolve the role
//! once per request and pass it in explicitly.

use crate::types::{Role, Section};

const ADMIN_SECTIONS: &[Section] = &[
    Section::Overview,
    Section::Projects,
    Section::ClosedProjects,
    Section::Tasks,
    Section::Hr,
    Section::Accounting,
    Section::Inventory,
    Section::Reports,
    Section::Settings,
    Section::AdminUsers,
];

const ACCOUNTANT_SECTIONS: &[Section] = &[
    Section::Overview,
    Section::Accounting,
    Section::Inventory,
    Section::Projects,
    Section::ClosedProjects,
];

const HR_ADMIN_SECTIONS: &[Section] = &[Section::Overview, Section::Tasks, Section::Hr];

const PROJECT_MANAGER_SECTIONS: &[Section] = &[
    Section::Overview,
    Section::Projects,
    Section::ClosedProjects,
    Section::Tasks,
    Section::Inventory,
];

const USER_SECTIONS: &[Section] = &[Section::Overview];

/// The ordered list of sections a role may open.
#[must_use]
pub const fn allowed_sections(role: Role) -> &'static [Section] {
    match role {
        Role::Admin => ADMIN_SECTIONS,
        Role::Accountant => ACCOUNTANT_SECTIONS,
        Role::HrAdmin => HR_ADMIN_SECTIONS,
        Role::ProjectManager => PROJECT_MANAGER_SECTIONS,
        Role::User => USER_SECTIONS,
    }
}

/// Whether `role` may open `section`.
#[must_use]
pub fn has_access(role: Role, section: Section) -> bool {
    allowed_sections(role).contains(&section)
}

/// String form of [`has_access`] for untyped input.
///
/// A missing or unrecognized role is treated as [`Role::User`]. An unknown
/// section is denied rather than reported as an error.
#[must_use]
pub fn has_access_str(role: Option<&str>, section: &str) -> bool {
    let role = Role::parse_or_default(role);
    section
        .parse::<Section>()
        .is_ok_and(|section| has_access(role, section))
}
