//! Print the role → section policy.

use opsdesk_core::{Role, allowed_sections};

pub fn print_policy() {
    for role in Role::ALL {
        let sections: Vec<&str> = allowed_sections(role).iter().map(|s| s.as_str()).collect();
        tracing::info!("{:<16} {}", role.as_str(), sections.join(", "));
    }
}
