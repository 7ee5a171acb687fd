//! Caller roles.
//!
//! Roles form a strict containment hierarchy: a `SuperAdmin` sees every
//! organization, an `Admin` exactly their own, a `MiniAdmin` exactly their
//! own area, and an `Inspector` only the instances assigned to them. The
//! scope resolver in `rounds-core` turns a role plus its attributes into a
//! concrete data filter on every request.

use serde::{Deserialize, Serialize};

/// The role attached to an authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Cross-tenant administrator; may impersonate an organization admin.
    SuperAdmin,
    /// Administrator of exactly one organization.
    Admin,
    /// Administrator of exactly one area.
    MiniAdmin,
    /// Executes inspections assigned to them; sees nothing else.
    Inspector,
}

impl Role {
    /// Whether this role may create inspections on demand.
    pub fn can_create_instances(&self) -> bool {
        matches!(self, Role::SuperAdmin | Role::Admin | Role::MiniAdmin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_names_match_wire_convention() {
        assert_eq!(
            serde_json::to_string(&Role::SuperAdmin).unwrap(),
            "\"SUPER_ADMIN\""
        );
        assert_eq!(
            serde_json::to_string(&Role::MiniAdmin).unwrap(),
            "\"MINI_ADMIN\""
        );
    }

    #[test]
    fn inspectors_cannot_create() {
        assert!(!Role::Inspector.can_create_instances());
        assert!(Role::MiniAdmin.can_create_instances());
    }
}
